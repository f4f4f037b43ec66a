use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Placeholder shown in the destination UI when a display string is unknown.
pub const UNKNOWN_TEXT: &str = "n/a";

/// Accessory category catalogue of the HomeKit bridge adapter.
///
/// The bridge persists categories as numeric strings (`"8"` for Switch).
/// Categories this tool never emits still round-trip via `Unknown` so that
/// manually created entries survive reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Airport,
    AirConditioner,
    AirDehumidifier,
    AirHeater,
    AirHumidifier,
    AirPurifier,
    AppleTv,
    AudioReceiver,
    AlarmSystem,
    Bridge,
    Camera,
    Door,
    DoorLock,
    Faucet,
    Fan,
    GarageDoorOpener,
    Homepod,
    Lightbulb,
    Other,
    Outlet,
    ProgrammableSwitch,
    Router,
    RangeExtender,
    ShowerHead,
    Speaker,
    Sprinkler,
    Sensor,
    Switch,
    TargetController,
    Television,
    TvSetTopBox,
    TvStreamingStick,
    Thermostat,
    VideoDoorbell,
    Window,
    WindowCovering,
    /// A category id not listed in the bridge catalogue
    Unknown(String),
}

impl Category {
    /// Numeric id used in the persisted bridge configuration
    pub fn id(&self) -> &str {
        match self {
            Self::Airport => "27",
            Self::AirConditioner => "21",
            Self::AirDehumidifier => "23",
            Self::AirHeater => "20",
            Self::AirHumidifier => "22",
            Self::AirPurifier => "19",
            Self::AppleTv => "24",
            Self::AudioReceiver => "34",
            Self::AlarmSystem => "11",
            Self::Bridge => "2",
            Self::Camera => "17",
            Self::Door => "12",
            Self::DoorLock => "6",
            Self::Faucet => "29",
            Self::Fan => "3",
            Self::GarageDoorOpener => "4",
            Self::Homepod => "25",
            Self::Lightbulb => "5",
            Self::Other => "1",
            Self::Outlet => "7",
            Self::ProgrammableSwitch => "15",
            Self::Router => "33",
            Self::RangeExtender => "16",
            Self::ShowerHead => "30",
            Self::Speaker => "26",
            Self::Sprinkler => "28",
            Self::Sensor => "10",
            Self::Switch => "8",
            Self::TargetController => "32",
            Self::Television => "31",
            Self::TvSetTopBox => "35",
            Self::TvStreamingStick => "36",
            Self::Thermostat => "9",
            Self::VideoDoorbell => "18",
            Self::Window => "13",
            Self::WindowCovering => "14",
            Self::Unknown(id) => id,
        }
    }
}

impl From<String> for Category {
    fn from(id: String) -> Self {
        match id.as_str() {
            "27" => Self::Airport,
            "21" => Self::AirConditioner,
            "23" => Self::AirDehumidifier,
            "20" => Self::AirHeater,
            "22" => Self::AirHumidifier,
            "19" => Self::AirPurifier,
            "24" => Self::AppleTv,
            "34" => Self::AudioReceiver,
            "11" => Self::AlarmSystem,
            "2" => Self::Bridge,
            "17" => Self::Camera,
            "12" => Self::Door,
            "6" => Self::DoorLock,
            "29" => Self::Faucet,
            "3" => Self::Fan,
            "4" => Self::GarageDoorOpener,
            "25" => Self::Homepod,
            "5" => Self::Lightbulb,
            "1" => Self::Other,
            "7" => Self::Outlet,
            "15" => Self::ProgrammableSwitch,
            "33" => Self::Router,
            "16" => Self::RangeExtender,
            "30" => Self::ShowerHead,
            "26" => Self::Speaker,
            "28" => Self::Sprinkler,
            "10" => Self::Sensor,
            "8" => Self::Switch,
            "32" => Self::TargetController,
            "31" => Self::Television,
            "35" => Self::TvSetTopBox,
            "36" => Self::TvStreamingStick,
            "9" => Self::Thermostat,
            "18" => Self::VideoDoorbell,
            "13" => Self::Window,
            "14" => Self::WindowCovering,
            _ => Self::Unknown(id),
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.id().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Binding mode of a characteristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InOutFunction {
    /// Constant value, never written back to the source
    Const,
    /// Mirror of a source state, reacting to acknowledged updates only
    StateOnlyAck,
    /// Two-way mirror of a source state
    State,
    /// A binding mode configured manually in the bridge UI
    Unknown(String),
}

impl InOutFunction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Const => "const",
            Self::StateOnlyAck => "ioBroker.State.OnlyACK",
            Self::State => "ioBroker.State",
            Self::Unknown(s) => s,
        }
    }
}

impl From<String> for InOutFunction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "const" => Self::Const,
            "ioBroker.State.OnlyACK" => Self::StateOnlyAck,
            "ioBroker.State" => Self::State,
            _ => Self::Unknown(s),
        }
    }
}

impl From<InOutFunction> for String {
    fn from(f: InOutFunction) -> Self {
        f.as_str().to_string()
    }
}

/// Named transform applied between source and destination representations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConversionFunction {
    /// Boolean inversion in both directions
    Invert,
    /// Small bidirectional script, see [`ConversionParameters`]
    Script,
    /// A transform configured manually in the bridge UI
    Unknown(String),
}

impl From<String> for ConversionFunction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "invert" => Self::Invert,
            "script" => Self::Script,
            _ => Self::Unknown(s),
        }
    }
}

impl From<ConversionFunction> for String {
    fn from(f: ConversionFunction) -> Self {
        match f {
            ConversionFunction::Invert => "invert".to_string(),
            ConversionFunction::Script => "script".to_string(),
            ConversionFunction::Unknown(s) => s,
        }
    }
}

/// Script bodies for a [`ConversionFunction::Script`] transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionParameters {
    #[serde(rename = "toHomeKit", skip_serializing_if = "Option::is_none")]
    pub to_home_kit: Option<String>,

    #[serde(rename = "toIOBroker", skip_serializing_if = "Option::is_none")]
    pub to_io_broker: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversionParameters {
    /// Bidirectional script
    pub fn script(to_home_kit: &str, to_io_broker: &str) -> Self {
        Self {
            to_home_kit: Some(to_home_kit.to_string()),
            to_io_broker: Some(to_io_broker.to_string()),
            extra: Map::new(),
        }
    }

    /// Script applied only towards the destination
    pub fn to_home_kit(script: &str) -> Self {
        Self {
            to_home_kit: Some(script.to_string()),
            to_io_broker: None,
            extra: Map::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Maps one destination capability property to a source data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Characteristic {
    /// Capability property identifier (e.g. `On`, `CurrentTemperature`)
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    pub in_out_function: InOutFunction,

    /// Literal value for `Const`, source state id otherwise
    pub in_out_parameters: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_function: Option<ConversionFunction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_parameters: Option<ConversionParameters>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Characteristic {
    /// Constant-valued characteristic
    pub fn constant(name: &str, value: impl Into<Value>) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            in_out_function: InOutFunction::Const,
            in_out_parameters: value.into(),
            conversion_function: None,
            conversion_parameters: None,
            extra: Map::new(),
        }
    }

    /// Characteristic mirroring a source state (acknowledged updates only)
    pub fn from_state(name: &str, state_id: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            in_out_function: InOutFunction::StateOnlyAck,
            in_out_parameters: Value::String(state_id.to_string()),
            conversion_function: None,
            conversion_parameters: None,
            extra: Map::new(),
        }
    }

    /// Attach a boolean-invert transform
    pub fn inverted(mut self) -> Self {
        self.conversion_function = Some(ConversionFunction::Invert);
        self
    }

    /// Attach a script transform
    pub fn with_script(mut self, parameters: ConversionParameters) -> Self {
        self.conversion_function = Some(ConversionFunction::Script);
        self.conversion_parameters = Some(parameters);
        self
    }
}

/// One capability group within an accessory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(rename = "type")]
    pub service_type: String,

    /// Disambiguator for accessories with several services of one type
    #[serde(default)]
    pub sub_type: String,

    pub name: String,

    pub characteristics: Vec<Characteristic>,

    /// Marks the anchor service of the accessory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,

    /// Name of the primary service this one is subordinate to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_to: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Service {
    pub fn new(service_type: &str, name: &str, characteristics: Vec<Characteristic>) -> Self {
        Self {
            service_type: service_type.to_string(),
            sub_type: String::new(),
            name: name.to_string(),
            characteristics,
            is_primary: None,
            link_to: None,
            extra: Map::new(),
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = Some(true);
        self
    }

    pub fn linked_to(mut self, primary_name: &str) -> Self {
        self.link_to = Some(primary_name.to_string());
        self
    }
}

/// One physical or logical device exposed to the HomeKit bridge.
///
/// The bridge derives the durable HomeKit identifier from `name`, so `name`
/// must never be regenerated for an unchanged source object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessory {
    pub name: String,

    pub category: Category,

    #[serde(default = "default_config_type")]
    pub config_type: String,

    #[serde(default = "default_text")]
    pub manufacturer: String,

    #[serde(default = "default_text")]
    pub model: String,

    #[serde(default = "default_text")]
    pub serial: String,

    #[serde(default = "default_text")]
    pub firmware: String,

    pub services: Vec<Service>,

    /// Grouping label for the destination UI, not part of identity
    #[serde(default)]
    pub group_string: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Source boolean state signalling online/offline liveness
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_state: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_config_type() -> String {
    "customdevice".to_string()
}

fn default_text() -> String {
    UNKNOWN_TEXT.to_string()
}

impl Accessory {
    /// Fully-populated accessory with placeholder display strings.
    ///
    /// Builders overwrite the display fields they know and push services
    /// afterwards; every field the bridge expects is already present.
    pub fn new(name: &str, category: Category, group_string: &str) -> Self {
        Self {
            name: name.to_string(),
            category,
            config_type: default_config_type(),
            manufacturer: default_text(),
            model: default_text(),
            serial: default_text(),
            firmware: default_text(),
            services: Vec::new(),
            group_string: group_string.to_string(),
            enabled: true,
            available_state: None,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        assert_eq!(Category::from("8".to_string()), Category::Switch);
        assert_eq!(Category::Switch.id(), "8");
        assert_eq!(Category::GarageDoorOpener.id(), "4");
        assert_eq!(
            Category::from("99".to_string()),
            Category::Unknown("99".to_string())
        );
        assert_eq!(Category::Unknown("99".to_string()).id(), "99");
    }

    #[test]
    fn test_characteristic_constructors() {
        let c = Characteristic::constant("Name", "Flur");
        assert!(c.enabled);
        assert_eq!(c.in_out_function, InOutFunction::Const);
        assert_eq!(c.in_out_parameters, Value::String("Flur".to_string()));

        let c = Characteristic::from_state("On", "rpi-io.0.pin.flur").inverted();
        assert_eq!(c.in_out_function, InOutFunction::StateOnlyAck);
        assert_eq!(c.conversion_function, Some(ConversionFunction::Invert));
    }

    #[test]
    fn test_accessory_wire_format() {
        let mut accessory = Accessory::new("shelly.0.Relay0", Category::Switch, "shelly.0");
        accessory.services.push(Service::new(
            "Switch",
            "Relay0",
            vec![
                Characteristic::constant("Name", "Relay0"),
                Characteristic::from_state("On", "shelly.0.SHPLG-S#X#1.Relay0.Switch"),
            ],
        ));

        let json = serde_json::to_value(&accessory).unwrap();
        assert_eq!(json["category"], "8");
        assert_eq!(json["configType"], "customdevice");
        assert_eq!(json["manufacturer"], UNKNOWN_TEXT);
        assert_eq!(json["enabled"], true);
        assert_eq!(json["services"][0]["type"], "Switch");
        assert_eq!(json["services"][0]["subType"], "");
        assert_eq!(
            json["services"][0]["characteristics"][1]["inOutFunction"],
            "ioBroker.State.OnlyACK"
        );
        // Optional fields are omitted entirely when unset
        assert!(json.get("availableState").is_none());
        assert!(json["services"][0].get("isPrimary").is_none());
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let raw = serde_json::json!({
            "name": "manual entry",
            "category": "42",
            "services": [{
                "type": "CustomService",
                "subType": "x",
                "name": "manual",
                "characteristics": [{
                    "name": "On",
                    "enabled": true,
                    "inOutFunction": "homematic.program",
                    "inOutParameters": 7,
                    "customKey": "kept"
                }],
                "rooms": ["Wohnzimmer"]
            }],
            "groupString": "manual",
            "pairedRoom": "Flur"
        });

        let accessory: Accessory = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(accessory.category, Category::Unknown("42".to_string()));
        assert!(accessory.enabled);
        assert_eq!(
            accessory.services[0].characteristics[0].in_out_function,
            InOutFunction::Unknown("homematic.program".to_string())
        );

        let back = serde_json::to_value(&accessory).unwrap();
        assert_eq!(back["pairedRoom"], "Flur");
        assert_eq!(back["services"][0]["rooms"][0], "Wohnzimmer");
        assert_eq!(
            back["services"][0]["characteristics"][0]["customKey"],
            "kept"
        );
    }
}
