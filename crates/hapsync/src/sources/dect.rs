use tracing::debug;
use tracing::error;

use super::instance_of;
use crate::accessory::Accessory;
use crate::accessory::Category;
use crate::accessory::Characteristic;
use crate::accessory::Service;
use crate::accessory::UNKNOWN_TEXT;
use crate::gateway::GatewayError;
use crate::gateway::ObjectClient;
use crate::gateway::ObjectKind;
use crate::history::History;

/// DECT smart home devices, classified by their product name state.
///
/// Each device channel carries sibling states with product metadata and the
/// measured values. Temperature and switching states additionally opt into
/// history logging so they can be charted.
pub async fn build<C: ObjectClient>(
    instance_id: &str,
    client: &C,
    history: &History,
) -> Result<Vec<Accessory>, GatewayError> {
    let mut accessories = Vec::new();

    let channels = client
        .get_objects(&format!("{instance_id}.*"), ObjectKind::Channel)
        .await?;

    for (id, _channel) in &channels {
        let Some(product) = client.get_state(&format!("{id}.productname")).await? else {
            continue;
        };
        let Some(product_name) = product.as_str().map(str::to_string) else {
            continue;
        };

        let (category, service_type, mut characteristics) = match product_name.as_str() {
            "FRITZ!DECT Repeater 100" => {
                history.enable(client, &format!("{id}.celsius")).await?;
                (
                    Category::Sensor,
                    "TemperatureSensor",
                    vec![Characteristic::from_state(
                        "CurrentTemperature",
                        &format!("{id}.celsius"),
                    )],
                )
            }
            "FRITZ!Smart Energy 200" => {
                history.enable(client, &format!("{id}.state")).await?;
                (
                    Category::Switch,
                    "Switch",
                    vec![Characteristic::from_state("On", &format!("{id}.state"))],
                )
            }
            "FRITZ!Smart Thermo 301" => {
                history.enable(client, &format!("{id}.tsoll")).await?;
                history.enable(client, &format!("{id}.tist")).await?;
                (
                    Category::Thermostat,
                    "Thermostat",
                    vec![
                        Characteristic::constant("TemperatureDisplayUnits", "0"),
                        Characteristic::from_state("TargetTemperature", &format!("{id}.tsoll")),
                        Characteristic::from_state("CurrentTemperature", &format!("{id}.tist")),
                        // 0 off, 1 heat, 2 cool, 3 auto
                        Characteristic::constant("TargetHeatingCoolingState", 3),
                        Characteristic::from_state(
                            "CurrentHeatingCoolingState",
                            &format!("{id}.heatingCoolingState"),
                        ),
                    ],
                )
            }
            other => {
                error!("unknown product name {:?} on {}", other, id);
                continue;
            }
        };

        let device_name = match client.get_state(&format!("{id}.name")).await? {
            Some(state) => state.as_str().unwrap_or("unknown").to_string(),
            None => "unknown".to_string(),
        };
        characteristics.push(Characteristic::constant("Name", device_name.as_str()));

        let manufacturer = client
            .get_state(&format!("{id}.manufacturer"))
            .await?
            .and_then(|s| s.as_str().map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_TEXT.to_string());
        let firmware = client
            .get_state(&format!("{id}.fwversion"))
            .await?
            .and_then(|s| s.as_str().map(str::to_string))
            .unwrap_or_else(|| UNKNOWN_TEXT.to_string());

        let segments: Vec<&str> = id.split('.').collect();
        let mut accessory = Accessory::new(id, category, &instance_of(id));
        accessory.manufacturer = manufacturer;
        accessory.model = device_name.clone();
        accessory.firmware = firmware;
        accessory.serial = segments.get(2).copied().unwrap_or_default().to_string();

        let service = Service::new(service_type, &device_name, characteristics);
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

    fn thermostat_fixture() -> MockObjectClient {
        let mock = MockObjectClient::new();
        mock.add_object(
            "fritzdect.0.DECT_099950049519",
            json!({"type": "channel", "common": {"name": "DECT_099950049519"}}),
        );
        mock.add_object(
            "fritzdect.0.DECT_099950049519.tsoll",
            json!({"type": "state", "common": {"type": "number"}}),
        );
        mock.add_object(
            "fritzdect.0.DECT_099950049519.tist",
            json!({"type": "state", "common": {"type": "number"}}),
        );
        mock.add_state(
            "fritzdect.0.DECT_099950049519.productname",
            json!("FRITZ!Smart Thermo 301"),
        );
        mock.add_state("fritzdect.0.DECT_099950049519.name", json!("Heizung Bad"));
        mock.add_state("fritzdect.0.DECT_099950049519.manufacturer", json!("AVM"));
        mock.add_state("fritzdect.0.DECT_099950049519.fwversion", json!("05.16"));
        mock
    }

    #[tokio::test]
    async fn test_thermostat_product() {
        let mock = thermostat_fixture();
        let history = History::with_provider("history.0");

        let accessories = build("fritzdect.0", &mock, &history).await.unwrap();
        assert_eq!(accessories.len(), 1);

        let thermostat = &accessories[0];
        assert_eq!(thermostat.name, "fritzdect.0.DECT_099950049519");
        assert_eq!(thermostat.category, Category::Thermostat);
        assert_eq!(thermostat.manufacturer, "AVM");
        assert_eq!(thermostat.model, "Heizung Bad");
        assert_eq!(thermostat.firmware, "05.16");
        assert_eq!(thermostat.serial, "DECT_099950049519");

        let service = &thermostat.services[0];
        assert_eq!(service.service_type, "Thermostat");
        let target = service
            .characteristics
            .iter()
            .find(|c| c.name == "TargetTemperature")
            .unwrap();
        assert_eq!(target.in_out_function, InOutFunction::StateOnlyAck);
        assert_eq!(
            target.in_out_parameters,
            json!("fritzdect.0.DECT_099950049519.tsoll")
        );

        // Target and current temperature are opted into history
        assert_eq!(mock.write_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_product_is_skipped_with_error_log() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "fritzdect.0.DECT_1",
            json!({"type": "channel", "common": {"name": "DECT_1"}}),
        );
        mock.add_state("fritzdect.0.DECT_1.productname", json!("FRITZ!Mystery 900"));

        let history = History::with_provider("history.0");
        let accessories = build("fritzdect.0", &mock, &history).await.unwrap();
        assert!(accessories.is_empty());
    }

    #[tokio::test]
    async fn test_missing_metadata_uses_placeholders() {
        let mock = MockObjectClient::new();
        mock.add_object(
            "fritzdect.0.DECT_2",
            json!({"type": "channel", "common": {"name": "DECT_2"}}),
        );
        mock.add_object(
            "fritzdect.0.DECT_2.state",
            json!({"type": "state", "common": {"type": "boolean"}}),
        );
        mock.add_state(
            "fritzdect.0.DECT_2.productname",
            json!("FRITZ!Smart Energy 200"),
        );

        let history = History::with_provider("history.0");
        let accessories = build("fritzdect.0", &mock, &history).await.unwrap();
        assert_eq!(accessories.len(), 1);
        assert_eq!(accessories[0].manufacturer, UNKNOWN_TEXT);
        assert_eq!(accessories[0].firmware, UNKNOWN_TEXT);
        assert_eq!(accessories[0].model, "unknown");
    }
}
