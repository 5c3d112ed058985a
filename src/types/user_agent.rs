use serde::Serialize;

/// Full classification of one request. Undetermined fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserAgent {
    pub ua: String,
    pub browser: Browser,
    pub engine: Engine,
    pub os: Os,
    pub device: Device,
    pub cpu: Cpu,
}

impl UserAgent {
    /// True when no category carries any data.
    pub fn is_empty(&self) -> bool {
        self.browser.is_empty()
            && self.engine.is_empty()
            && self.os.is_empty()
            && self.device.is_empty()
            && self.cpu.is_empty()
    }

    pub fn is_bot(&self) -> bool {
        self.device.device_type() == Some(super::DeviceType::Bot)
            || self.browser.browser_type().is_some_and(|t| t.is_bot())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Browser {
    pub name: String,
    pub version: String,
    /// Leading numeric run of `version`.
    pub major: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Browser {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.version.is_empty() && self.kind.is_empty()
    }

    pub fn browser_type(&self) -> Option<super::BrowserType> {
        super::BrowserType::from_str(&self.kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Engine {
    pub name: String,
    pub version: String,
}

impl Engine {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.version.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Os {
    /// First comment token of the UA, e.g. `Windows`, `iPhone`, `Linux`.
    pub platform: String,
    pub name: String,
    pub version: String,
}

impl Os {
    pub fn is_empty(&self) -> bool {
        self.platform.is_empty() && self.name.is_empty() && self.version.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Device {
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
    pub vendor: String,
}

impl Device {
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty() && self.model.is_empty() && self.vendor.is_empty()
    }

    pub fn device_type(&self) -> Option<super::DeviceType> {
        super::DeviceType::from_str(&self.kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cpu {
    pub architecture: String,
}

impl Cpu {
    pub fn is_empty(&self) -> bool {
        self.architecture.is_empty()
    }
}
