use tracing::debug;

use super::instance_of;
use super::BuildError;
use crate::accessory::Accessory;
use crate::accessory::Category;
use crate::accessory::Characteristic;
use crate::accessory::ConversionParameters;
use crate::accessory::Service;
use crate::accessory::UNKNOWN_TEXT;
use crate::directory::Definition;
use crate::directory::DeviceDirectory;
use crate::directory::ZigbeeDevice;
use crate::gateway::ObjectClient;
use crate::gateway::ObjectKind;
use crate::history::History;

/// Feature name to sibling state worth charting
const HISTORY_STATES: [(&str, &str); 6] = [
    ("linkquality", "link_quality"),
    ("contact", "opened"),
    ("water_leak", "detected"),
    ("battery", "battery"),
    ("device_temperature", "device_temperature"),
    ("voltage", "voltage"),
];

/// Accessories for zigbee devices, cross-referenced with the live
/// directory of the bridge.
///
/// Local device objects carry the hardware address as their id leaf; the
/// directory record found under that address decides which services the
/// device gets. Devices without a recognized feature set produce no
/// accessory but still have their diagnostic states opted into history.
pub async fn build<C: ObjectClient, D: DeviceDirectory>(
    instance_id: &str,
    client: &C,
    directory: &D,
    history: &History,
) -> Result<Vec<Accessory>, BuildError> {
    let devices = directory.fetch().await?;

    let local_devices = client
        .get_objects(&format!("{instance_id}.*"), ObjectKind::Device)
        .await?;

    let mut accessories = Vec::new();

    for id in local_devices.keys() {
        let address = id.rsplit('.').next().unwrap_or("");
        let Some(device) = devices.iter().find(|d| d.ieee_address == address) else {
            debug!("{} is not in the live directory", id);
            continue;
        };

        for (feature, state) in HISTORY_STATES {
            if device.definition.has_feature(feature) {
                history.enable(client, &format!("{id}.{state}")).await?;
            }
        }
        history.enable(client, &format!("{id}.available")).await?;

        match synthesize(id, device) {
            Some(accessory) => accessories.push(accessory),
            None => debug!("{} ({}) has no supported feature set", id, device.friendly_name),
        }
    }

    Ok(accessories)
}

/// Build the accessory for one matched device, if any feature set applies
fn synthesize(id: &str, device: &ZigbeeDevice) -> Option<Accessory> {
    let definition = &device.definition;
    let name = device.friendly_name.clone();

    let (category, mut services) = if let Some(light) = definition.light_group() {
        let mut characteristics = Vec::new();
        for feature in &light.features {
            match feature.name.as_str() {
                "state" => {
                    characteristics.push(Characteristic::from_state("On", &format!("{id}.state")));
                }
                "brightness" => {
                    characteristics.push(Characteristic::from_state(
                        "Brightness",
                        &format!("{id}.brightness"),
                    ));
                }
                "color_temp" => {
                    // HomeKit rejects mireds below 153
                    characteristics.push(
                        Characteristic::from_state("ColorTemperature", &format!("{id}.colortemp"))
                            .with_script(ConversionParameters::script(
                                "return Math.max(153, value)",
                                "return Math.max(153, value)",
                            )),
                    );
                }
                _ => {}
            }
        }
        (
            Category::Lightbulb,
            vec![Service::new("Lightbulb", &name, characteristics)],
        )
    } else if definition.has_feature("contact") {
        let mut services = vec![Service::new(
            "ContactSensor",
            &name,
            vec![Characteristic::from_state(
                "ContactSensorState",
                &format!("{id}.opened"),
            )],
        )
        .primary()];
        services.extend(battery_service(id, &name, definition));
        (Category::Sensor, services)
    } else if definition.has_feature("water_leak") {
        let mut services = vec![Service::new(
            "LeakSensor",
            &name,
            vec![Characteristic::from_state(
                "LeakDetected",
                &format!("{id}.detected"),
            )],
        )
        .primary()];
        services.extend(battery_service(id, &name, definition));
        (Category::Sensor, services)
    } else if definition.has_feature("occupancy") {
        let mut services = vec![Service::new(
            "OccupancySensor",
            &name,
            vec![Characteristic::from_state(
                "OccupancyDetected",
                &format!("{id}.occupancy"),
            )],
        )
        .primary()];
        if definition.has_feature("illuminance") {
            services.push(
                Service::new(
                    "LightSensor",
                    &format!("{name} Helligkeit"),
                    vec![Characteristic::from_state(
                        "CurrentAmbientLightLevel",
                        &format!("{id}.illuminance_raw"),
                    )],
                )
                .linked_to(&name),
            );
        }
        services.extend(battery_service(id, &name, definition));
        (Category::Sensor, services)
    } else if definition.has_feature("humidity") {
        let mut services = vec![Service::new(
            "HumiditySensor",
            &name,
            vec![Characteristic::from_state(
                "CurrentRelativeHumidity",
                &format!("{id}.humidity"),
            )],
        )
        .primary()];
        if definition.has_feature("temperature") {
            services.push(
                Service::new(
                    "TemperatureSensor",
                    &format!("{name} Temperatur"),
                    vec![Characteristic::from_state(
                        "CurrentTemperature",
                        &format!("{id}.temperature"),
                    )],
                )
                .linked_to(&name),
            );
        }
        services.extend(battery_service(id, &name, definition));
        (Category::Sensor, services)
    } else {
        return None;
    };

    for service in &mut services {
        let service_name = service.name.clone();
        service
            .characteristics
            .push(Characteristic::constant("Name", service_name));
        debug!("{} {} {}", service.service_type, id, service.name);
    }

    let group = instance_of(id);
    let mut accessory = Accessory::new(&format!("{}.{}", group, name), category, &group);
    accessory.model = name;
    accessory.manufacturer = format!(
        "{} {} ({})",
        definition.vendor, device.model_id, definition.model
    );
    accessory.serial = device.ieee_address.clone();
    accessory.firmware = device
        .software_build_id
        .clone()
        .unwrap_or_else(|| UNKNOWN_TEXT.to_string());
    accessory.available_state = Some(format!("{id}.available"));
    accessory.services = services;

    Some(accessory)
}

/// Linked battery service with a low-battery threshold at 10 percent
fn battery_service(id: &str, device_name: &str, definition: &Definition) -> Option<Service> {
    if !definition.has_feature("battery") {
        return None;
    }
    Some(
        Service::new(
            "Battery",
            &format!("{device_name} Batterie"),
            vec![
                Characteristic::from_state("BatteryLevel", &format!("{id}.battery")),
                Characteristic::from_state("StatusLowBattery", &format!("{id}.battery"))
                    .with_script(ConversionParameters::to_home_kit("return (value < 10);")),
            ],
        )
        .linked_to(device_name),
    )
}
