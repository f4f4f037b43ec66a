use std::collections::BTreeMap;

use tracing::debug;

use crate::accessory::Accessory;
use crate::accessory::Category;
use crate::accessory::Characteristic;
use crate::accessory::Service;
use crate::gateway::ForeignObject;
use crate::gateway::GatewayError;
use crate::gateway::ObjectClient;
use crate::gateway::ObjectKind;

/// Relay and light-group channels of the smart plug bridge.
///
/// Channels ending in `Relay<n>` map to Switch accessories, dimmer channels
/// named `lights` to Lightbulb accessories with a Brightness binding. Both
/// mirror their on/off state from the sibling `.Switch` state.
pub async fn build<C: ObjectClient>(
    instance_id: &str,
    client: &C,
) -> Result<Vec<Accessory>, GatewayError> {
    let mut accessories = Vec::new();

    let mut channels: BTreeMap<String, ForeignObject> = client
        .get_objects(&format!("{instance_id}.*.lights"), ObjectKind::Channel)
        .await?;
    channels.extend(
        client
            .get_objects(&format!("{instance_id}.*.Relay*"), ObjectKind::Channel)
            .await?,
    );

    for (id, channel) in &channels {
        let segments: Vec<&str> = id.split('.').collect();
        let leaf = segments.last().copied().unwrap_or("");
        let name = channel.display_name().unwrap_or_else(|| leaf.to_string());

        let (category, service_type, mut characteristics) = if leaf.starts_with("Relay") {
            (
                Category::Switch,
                "Switch",
                vec![Characteristic::from_state("On", &format!("{id}.Switch"))],
            )
        } else if leaf == "lights" {
            (
                Category::Lightbulb,
                "Lightbulb",
                vec![
                    Characteristic::from_state("On", &format!("{id}.Switch")),
                    Characteristic::from_state("Brightness", &format!("{id}.brightness")),
                ],
            )
        } else {
            continue;
        };

        characteristics.push(Characteristic::constant("Name", name.as_str()));

        let mut accessory = Accessory::new(&name, category, instance_id);
        accessory.manufacturer = "shelly".to_string();
        accessory.serial = segments.get(2..4).unwrap_or_default().join(".");
        accessory.available_state = Some(format!(
            "{}.online",
            segments.get(..3).unwrap_or_default().join(".")
        ));

        let service = Service::new(service_type, &name, characteristics);
        debug!("{} {} {}", service.service_type, accessory.name, service.name);
        accessory.services.push(service);
        accessories.push(accessory);
    }

    Ok(accessories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockObjectClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_relay_channel_becomes_switch() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "shelly.0.SHPLG-S#X#1.Relay0",
            json!({"type": "channel", "common": {"name": "Relay0"}}),
        );

        let accessories = build("shelly.0", &mock).await.unwrap();
        assert_eq!(accessories.len(), 1);

        let relay = &accessories[0];
        assert_eq!(relay.name, "Relay0");
        assert_eq!(relay.category, Category::Switch);
        assert_eq!(relay.serial, "SHPLG-S#X#1.Relay0");
        assert_eq!(
            relay.available_state.as_deref(),
            Some("shelly.0.SHPLG-S#X#1.online")
        );

        let service = &relay.services[0];
        assert_eq!(service.service_type, "Switch");
        assert_eq!(
            service.characteristics[0].in_out_parameters,
            json!("shelly.0.SHPLG-S#X#1.Relay0.Switch")
        );
        assert_eq!(service.characteristics[1].name, "Name");
    }

    #[tokio::test]
    async fn test_lights_channel_becomes_lightbulb_with_brightness() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "shelly.0.SHDM-2#94B97E16BE61#1.lights",
            json!({"type": "channel", "common": {"name": "Schlafzimmer"}}),
        );

        let accessories = build("shelly.0", &mock).await.unwrap();
        assert_eq!(accessories.len(), 1);

        let light = &accessories[0];
        assert_eq!(light.name, "Schlafzimmer");
        assert_eq!(light.category, Category::Lightbulb);

        let names: Vec<&str> = light.services[0]
            .characteristics
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["On", "Brightness", "Name"]);
        assert_eq!(
            light.services[0].characteristics[1].in_out_parameters,
            json!("shelly.0.SHDM-2#94B97E16BE61#1.lights.brightness")
        );
    }
}
