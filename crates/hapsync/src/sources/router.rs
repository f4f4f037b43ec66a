use tracing::debug;

use super::instance_of;
use super::local_part;
use crate::accessory::Accessory;
use crate::accessory::Category;
use crate::accessory::Characteristic;
use crate::accessory::Service;
use crate::gateway::GatewayError;
use crate::gateway::ObjectClient;
use crate::gateway::ObjectKind;

/// Wireless toggles flap with guest access and scheduling; they are noise
/// as HomeKit switches.
const NOISE_STATES: [&str; 3] = ["wlan", "wlan24", "wlan50"];

/// One Switch accessory per boolean router toggle state
pub async fn build<C: ObjectClient>(
    instance_id: &str,
    client: &C,
) -> Result<Vec<Accessory>, GatewayError> {
    let mut accessories = Vec::new();

    let states = client
        .get_objects(&format!("{instance_id}.states.*"), ObjectKind::State)
        .await?;

    for (id, state) in &states {
        let leaf = id.rsplit('.').next().unwrap_or("");
        if state.common.data_type.as_deref() != Some("boolean") || NOISE_STATES.contains(&leaf) {
            continue;
        }

        let name = state.display_name().unwrap_or_else(|| leaf.to_string());
        let instance = instance_of(id);

        // Keyed by the state id so the HomeKit identity survives renames
        let mut accessory = Accessory::new(id, Category::Switch, &instance);
        accessory.manufacturer = instance.clone();
        accessory.serial = local_part(id);
        accessory.model = name.clone();

        let service = Service::new(
            "Switch",
            &name,
            vec![
                Characteristic::constant("Name", name.as_str()),
                Characteristic::from_state("On", id),
            ],
        );
        debug!("{} {} {}", service.service_type, accessory.name, service.name);
        accessory.services.push(service);
        accessories.push(accessory);
    }

    Ok(accessories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessory::InOutFunction;
    use crate::gateway::MockObjectClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_boolean_toggles_become_switches() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "tr-064.0.states.wps",
            json!({"type": "state", "common": {"name": "WPS", "type": "boolean"}}),
        );
        mock.add_object(
            "tr-064.0.states.reboot",
            json!({"type": "state", "common": {"name": "Reboot", "type": "boolean"}}),
        );
        // Excluded: wireless toggle and a non-boolean state
        mock.add_object(
            "tr-064.0.states.wlan24",
            json!({"type": "state", "common": {"name": "WLAN 2.4", "type": "boolean"}}),
        );
        mock.add_object(
            "tr-064.0.states.externalIP",
            json!({"type": "state", "common": {"name": "External IP", "type": "string"}}),
        );

        let accessories = build("tr-064.0", &mock).await.unwrap();
        assert_eq!(accessories.len(), 2);

        let reboot = accessories
            .iter()
            .find(|a| a.name == "tr-064.0.states.reboot")
            .unwrap();
        assert_eq!(reboot.category, Category::Switch);
        assert_eq!(reboot.manufacturer, "tr-064.0");
        assert_eq!(reboot.serial, "states.reboot");
        assert_eq!(reboot.model, "Reboot");

        let service = &reboot.services[0];
        assert_eq!(service.service_type, "Switch");
        assert_eq!(service.characteristics[0].name, "Name");
        assert_eq!(
            service.characteristics[0].in_out_parameters,
            json!("Reboot")
        );
        assert_eq!(service.characteristics[1].name, "On");
        assert_eq!(
            service.characteristics[1].in_out_function,
            InOutFunction::StateOnlyAck
        );
        assert_eq!(
            service.characteristics[1].in_out_parameters,
            json!("tr-064.0.states.reboot")
        );
    }
}
