#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Bot,
    Console,
    SmartTv,
    Wearable,
    Xr,
    Embedded,
}

impl DeviceType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mobile" => Some(Self::Mobile),
            "tablet" => Some(Self::Tablet),
            "desktop" => Some(Self::Desktop),
            "bot" => Some(Self::Bot),
            "console" => Some(Self::Console),
            "smarttv" => Some(Self::SmartTv),
            "wearable" => Some(Self::Wearable),
            "xr" => Some(Self::Xr),
            "embedded" => Some(Self::Embedded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
            Self::Bot => "bot",
            Self::Console => "console",
            Self::SmartTv => "smarttv",
            Self::Wearable => "wearable",
            Self::Xr => "xr",
            Self::Embedded => "embedded",
        }
    }
}
