use tracing::debug;

use super::local_part;
use crate::accessory::Accessory;
use crate::accessory::Category;
use crate::accessory::Characteristic;
use crate::accessory::ConversionParameters;
use crate::accessory::Service;
use crate::gateway::GatewayError;
use crate::gateway::ObjectClient;
use crate::gateway::ObjectKind;

/// Floor heating bridge: one Switch for the house pause toggle and one
/// Thermostat per room target temperature.
pub async fn build<C: ObjectClient>(
    instance_id: &str,
    client: &C,
) -> Result<Vec<Accessory>, GatewayError> {
    let mut accessories = Vec::new();

    // House-level pause toggle, present on newer bridge firmware only
    let pause_id = format!("{instance_id}.House.HousePause");
    if let Some(pause) = client.get_object(&pause_id).await? {
        let name = pause
            .display_name()
            .unwrap_or_else(|| "HousePause".to_string());

        let mut accessory = Accessory::new(&pause_id, Category::Switch, instance_id);
        accessory.manufacturer = instance_id.to_string();
        accessory.model = name.clone();
        accessory.serial = local_part(&pause_id);

        let service = Service::new(
            "Switch",
            &name,
            vec![
                Characteristic::constant("Name", name.as_str()),
                Characteristic::from_state("On", &pause_id),
            ],
        );
        debug!("{} {} {}", service.service_type, accessory.name, service.name);
        accessory.services.push(service);
        accessories.push(accessory);
    }

    // One thermostat per room
    let targets = client
        .get_objects(&format!("{instance_id}.room-*.TargetTemp"), ObjectKind::State)
        .await?;

    for (id, target) in &targets {
        let base = id.rsplit_once('.').map(|(base, _)| base).unwrap_or(id);
        let name = target
            .display_name()
            .unwrap_or_else(|| local_part(id));

        let mut accessory = Accessory::new(id, Category::Thermostat, instance_id);
        accessory.manufacturer = instance_id.to_string();
        accessory.model = name.clone();
        accessory.serial = local_part(id);
        accessory.available_state = Some(format!("{instance_id}.House.PeerConnected"));

        // Target mode is pinned to auto; the current mode is derived from
        // the valve state (open heats, closed idles as cooling).
        let service = Service::new(
            "Thermostat",
            &name,
            vec![
                Characteristic::constant("Name", name.as_str()),
                Characteristic::from_state("TargetTemperature", &format!("{base}.TargetTemp")),
                Characteristic::from_state("CurrentTemperature", &format!("{base}.RoomTemp")),
                Characteristic::constant("TemperatureDisplayUnits", "0"),
                Characteristic::constant("TargetHeatingCoolingState", "3"),
                Characteristic::from_state(
                    "CurrentHeatingCoolingState",
                    &format!("{base}.ValveState"),
                )
                .with_script(ConversionParameters::script(
                    "return (value) ? 1 : 2;",
                    "return (value == 1);",
                )),
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
    use crate::accessory::ConversionFunction;
    use crate::gateway::MockObjectClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_rooms_become_thermostats() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "danfossicon.0.House.HousePause",
            json!({"type": "state", "common": {"name": "House Pause", "type": "boolean"}}),
        );
        mock.add_object(
            "danfossicon.0.room-01.TargetTemp",
            json!({"type": "state", "common": {"name": "Wohnzimmer", "type": "number"}}),
        );
        mock.add_object(
            "danfossicon.0.room-02.TargetTemp",
            json!({"type": "state", "common": {"name": "Küche", "type": "number"}}),
        );

        let accessories = build("danfossicon.0", &mock).await.unwrap();
        assert_eq!(accessories.len(), 3);

        let pause = &accessories[0];
        assert_eq!(pause.name, "danfossicon.0.House.HousePause");
        assert_eq!(pause.category, Category::Switch);

        let room = accessories
            .iter()
            .find(|a| a.name == "danfossicon.0.room-01.TargetTemp")
            .unwrap();
        assert_eq!(room.category, Category::Thermostat);
        assert_eq!(
            room.available_state.as_deref(),
            Some("danfossicon.0.House.PeerConnected")
        );

        let service = &room.services[0];
        let current_mode = service
            .characteristics
            .iter()
            .find(|c| c.name == "CurrentHeatingCoolingState")
            .unwrap();
        assert_eq!(
            current_mode.in_out_parameters,
            json!("danfossicon.0.room-01.ValveState")
        );
        assert_eq!(
            current_mode.conversion_function,
            Some(ConversionFunction::Script)
        );
        assert_eq!(
            current_mode
                .conversion_parameters
                .as_ref()
                .unwrap()
                .to_home_kit
                .as_deref(),
            Some("return (value) ? 1 : 2;")
        );

        let current_temp = service
            .characteristics
            .iter()
            .find(|c| c.name == "CurrentTemperature")
            .unwrap();
        assert_eq!(
            current_temp.in_out_parameters,
            json!("danfossicon.0.room-01.RoomTemp")
        );
    }

    #[tokio::test]
    async fn test_missing_house_pause_is_fine() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "danfossicon.0.room-01.TargetTemp",
            json!({"type": "state", "common": {"name": "Bad", "type": "number"}}),
        );

        let accessories = build("danfossicon.0", &mock).await.unwrap();
        assert_eq!(accessories.len(), 1);
        assert_eq!(accessories[0].services[0].service_type, "Thermostat");
    }
}
