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

/// Accessories derived from the declared semantic role of a state.
///
/// GPIO style integrations tag their pins with roles like `switch.light`
/// or `sensor.contact`; each supported role maps to exactly one service
/// type. Lock and garage roles drive their target through the state itself
/// and read the current position from a `_status` companion state, both
/// inverted because the wiring reports active-low.
pub async fn build<C: ObjectClient>(
    instance_id: &str,
    client: &C,
) -> Result<Vec<Accessory>, GatewayError> {
    let mut accessories = Vec::new();

    let states = client
        .get_objects(&format!("{instance_id}.*"), ObjectKind::State)
        .await?;

    for (id, state) in &states {
        let Some(role) = state.common.role.as_deref() else {
            continue;
        };
        let name = state
            .display_name()
            .unwrap_or_else(|| local_part(id));

        let service = match role {
            "sensor.contact" => Some((
                Category::Sensor,
                Service::new(
                    "ContactSensor",
                    &name,
                    vec![
                        Characteristic::constant("Name", name.as_str()),
                        Characteristic::from_state("ContactSensorState", id),
                    ],
                ),
            )),
            "sensor.motion" => Some((
                Category::Sensor,
                Service::new(
                    "MotionSensor",
                    &name,
                    vec![
                        Characteristic::constant("Name", name.as_str()),
                        Characteristic::from_state("MotionDetected", id),
                    ],
                ),
            )),
            "sensor.occupancy" => Some((
                Category::Sensor,
                Service::new(
                    "OccupancySensor",
                    &name,
                    vec![
                        Characteristic::constant("Name", name.as_str()),
                        Characteristic::from_state("OccupancyDetected", id),
                    ],
                ),
            )),
            "sensor.leak" => Some((
                Category::Sensor,
                Service::new(
                    "LeakSensor",
                    &name,
                    vec![
                        Characteristic::constant("Name", name.as_str()),
                        Characteristic::from_state("LeakDetected", id),
                    ],
                ),
            )),
            "switch" => Some((
                Category::Switch,
                Service::new(
                    "Switch",
                    &name,
                    vec![
                        Characteristic::constant("Name", name.as_str()),
                        Characteristic::from_state("On", id),
                    ],
                ),
            )),
            "switch.light" => Some((
                Category::Lightbulb,
                Service::new(
                    "Lightbulb",
                    &name,
                    vec![
                        Characteristic::constant("Name", name.as_str()),
                        Characteristic::from_state("On", id),
                    ],
                ),
            )),
            "switch.lock.door" => Some((
                Category::DoorLock,
                Service::new(
                    "LockMechanism",
                    &name,
                    vec![
                        Characteristic::constant("Name", name.as_str()),
                        Characteristic::from_state("LockTargetState", id).inverted(),
                        Characteristic::from_state("LockCurrentState", &format!("{id}_status"))
                            .inverted(),
                    ],
                ),
            )),
            "switch.garage" => Some((
                Category::GarageDoorOpener,
                Service::new(
                    "GarageDoorOpener",
                    &name,
                    vec![
                        Characteristic::constant("Name", name.as_str()),
                        Characteristic::from_state("TargetDoorState", id).inverted(),
                        Characteristic::from_state("CurrentDoorState", &format!("{id}_status"))
                            .inverted(),
                        Characteristic::constant("ObstructionDetected", false),
                    ],
                ),
            )),
            "switch.fan" => Some((
                Category::Fan,
                Service::new(
                    "Fan",
                    &name,
                    vec![
                        Characteristic::constant("Name", name.as_str()),
                        Characteristic::from_state("On", id),
                    ],
                ),
            )),
            _ => None,
        };

        let Some((category, service)) = service else {
            continue;
        };

        let instance = instance_of(id);
        let mut accessory = Accessory::new(id, category, &instance);
        accessory.manufacturer = instance.clone();
        accessory.serial = local_part(id);
        accessory.model = name.clone();

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
    use crate::accessory::InOutFunction;
    use crate::gateway::MockObjectClient;
    use serde_json::json;

    #[tokio::test]
    async fn test_light_role_mapping_is_deterministic() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "rpi-io.0.pin.flur",
            json!({"type": "state", "common": {"name": "Flur", "role": "switch.light", "type": "boolean"}}),
        );

        let accessories = build("rpi-io.0", &mock).await.unwrap();
        assert_eq!(accessories.len(), 1);

        let light = &accessories[0];
        assert_eq!(light.name, "rpi-io.0.pin.flur");
        assert_eq!(light.category, Category::Lightbulb);
        assert_eq!(light.services.len(), 1);

        let service = &light.services[0];
        assert_eq!(service.service_type, "Lightbulb");
        assert_eq!(service.characteristics.len(), 2);
        assert_eq!(service.characteristics[0].name, "Name");
        assert_eq!(service.characteristics[0].in_out_function, InOutFunction::Const);
        assert_eq!(service.characteristics[0].in_out_parameters, json!("Flur"));
        assert_eq!(service.characteristics[1].name, "On");
        assert_eq!(
            service.characteristics[1].in_out_function,
            InOutFunction::StateOnlyAck
        );
        assert_eq!(
            service.characteristics[1].in_out_parameters,
            json!("rpi-io.0.pin.flur")
        );
    }

    #[tokio::test]
    async fn test_lock_role_uses_inverted_status_companion() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "switchboard-io.0.pin.tür",
            json!({"type": "state", "common": {"name": "Haustür", "role": "switch.lock.door", "type": "boolean"}}),
        );

        let accessories = build("switchboard-io.0", &mock).await.unwrap();
        assert_eq!(accessories.len(), 1);
        assert_eq!(accessories[0].category, Category::DoorLock);

        let service = &accessories[0].services[0];
        assert_eq!(service.service_type, "LockMechanism");

        let target = service
            .characteristics
            .iter()
            .find(|c| c.name == "LockTargetState")
            .unwrap();
        assert_eq!(target.conversion_function, Some(ConversionFunction::Invert));
        assert_eq!(target.in_out_parameters, json!("switchboard-io.0.pin.tür"));

        let current = service
            .characteristics
            .iter()
            .find(|c| c.name == "LockCurrentState")
            .unwrap();
        assert_eq!(
            current.in_out_parameters,
            json!("switchboard-io.0.pin.tür_status")
        );
    }

    #[tokio::test]
    async fn test_unsupported_roles_are_skipped() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "rpi-io.0.pin.temp",
            json!({"type": "state", "common": {"name": "Temp", "role": "value.temperature", "type": "number"}}),
        );
        mock.add_object(
            "rpi-io.0.pin.raw",
            json!({"type": "state", "common": {"name": "Raw", "type": "boolean"}}),
        );

        let accessories = build("rpi-io.0", &mock).await.unwrap();
        assert!(accessories.is_empty());
    }
}
