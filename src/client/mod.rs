//! Client classification: turn a raw `User-Agent` string into a normalized
//! descriptor (agent family, version, OS, device class).
//!
//! User-agent sniffing is heuristic by nature; the table below covers the
//! mainstream families and errs toward the conservative default. Unknown or
//! empty strings classify as a desktop with an empty family, which downstream
//! policy treats as challenge-required — never as a bypass.

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }
}

/// Normalized description of the requesting client. Derived per request,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClientDescriptor {
    /// Agent family, e.g. `Chrome` or `Edge`. Empty when unrecognized.
    pub family: String,
    pub version: Option<String>,
    pub os: Option<String>,
    pub device: DeviceClass,
}

impl ClientDescriptor {
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        self.device == DeviceClass::Mobile
    }

    #[must_use]
    pub fn is_tablet(&self) -> bool {
        self.device == DeviceClass::Tablet
    }
}

/// Classify a raw user-agent string.
///
/// Deterministic and side-effect free. Empty or unrecognized input yields a
/// desktop descriptor with an empty family.
#[must_use]
pub fn classify(user_agent: &str) -> ClientDescriptor {
    let ua = user_agent.trim();
    let (family, version) = detect_family(ua);
    ClientDescriptor {
        family: family.to_string(),
        version,
        os: detect_os(ua),
        device: detect_device(ua),
    }
}

fn detect_family(ua: &str) -> (&'static str, Option<String>) {
    // Order matters: Chromium-based agents all advertise "Chrome/", so the
    // more specific markers are checked first.
    if contains_any(ua, &["Edg/", "Edge/", "EdgA/", "EdgiOS/"]) {
        return ("Edge", capture_version(ua, r"(?:Edg|Edge|EdgA|EdgiOS)/([0-9][0-9.]*)"));
    }
    if contains_any(ua, &["MSIE", "Trident/"]) {
        return ("IE", capture_version(ua, r"(?:MSIE |rv:)([0-9][0-9.]*)"));
    }
    if contains_any(ua, &["OPR/", "Opera"]) {
        return ("Opera", capture_version(ua, r"(?:OPR|Opera)[/ ]([0-9][0-9.]*)"));
    }
    if contains_any(ua, &["Chrome/", "CriOS/"]) {
        return ("Chrome", capture_version(ua, r"(?:Chrome|CriOS)/([0-9][0-9.]*)"));
    }
    if contains_any(ua, &["Firefox/", "FxiOS/"]) {
        return ("Firefox", capture_version(ua, r"(?:Firefox|FxiOS)/([0-9][0-9.]*)"));
    }
    if ua.contains("Safari/") {
        return ("Safari", capture_version(ua, r"Version/([0-9][0-9.]*)"));
    }
    ("", None)
}

fn detect_os(ua: &str) -> Option<String> {
    if ua.contains("Windows NT") {
        Some("Windows".to_string())
    } else if contains_any(ua, &["iPhone OS", "CPU OS", "like Mac OS X"]) {
        Some("iOS".to_string())
    } else if ua.contains("Mac OS X") {
        Some("macOS".to_string())
    } else if ua.contains("CrOS") {
        Some("Chrome OS".to_string())
    } else if ua.contains("Android") {
        Some("Android".to_string())
    } else if ua.contains("Linux") {
        Some("Linux".to_string())
    } else {
        None
    }
}

fn detect_device(ua: &str) -> DeviceClass {
    if contains_any(ua, &["iPad", "Tablet"]) {
        return DeviceClass::Tablet;
    }
    // Android tablets advertise "Android" without the "Mobile" token.
    if ua.contains("Android") && !ua.contains("Mobile") {
        return DeviceClass::Tablet;
    }
    if contains_any(ua, &["iPhone", "iPod", "Mobile"]) {
        return DeviceClass::Mobile;
    }
    DeviceClass::Desktop
}

fn contains_any(ua: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| ua.contains(needle))
}

fn capture_version(ua: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(ua)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) \
         AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_1 like Mac OS X) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const IE11: &str = "Mozilla/5.0 (Windows NT 10.0; Trident/7.0; rv:11.0) like Gecko";

    #[test]
    fn classifies_chrome_desktop() {
        let descriptor = classify(CHROME_DESKTOP);
        assert_eq!(descriptor.family, "Chrome");
        assert_eq!(descriptor.version.as_deref(), Some("120.0.0.0"));
        assert_eq!(descriptor.os.as_deref(), Some("Windows"));
        assert_eq!(descriptor.device, DeviceClass::Desktop);
    }

    #[test]
    fn classifies_edge_before_chrome() {
        // Edge advertises Chrome/ too; the Edg/ marker must win.
        let descriptor = classify(EDGE_DESKTOP);
        assert_eq!(descriptor.family, "Edge");
        assert_eq!(descriptor.version.as_deref(), Some("120.0.2210.91"));
    }

    #[test]
    fn classifies_android_phone_as_mobile() {
        let descriptor = classify(CHROME_ANDROID);
        assert_eq!(descriptor.family, "Chrome");
        assert_eq!(descriptor.os.as_deref(), Some("Android"));
        assert!(descriptor.is_mobile());
    }

    #[test]
    fn classifies_ipad_as_tablet() {
        let descriptor = classify(SAFARI_IPAD);
        assert_eq!(descriptor.family, "Safari");
        assert_eq!(descriptor.os.as_deref(), Some("iOS"));
        assert!(descriptor.is_tablet());
    }

    #[test]
    fn classifies_ie11() {
        let descriptor = classify(IE11);
        assert_eq!(descriptor.family, "IE");
        assert_eq!(descriptor.version.as_deref(), Some("11.0"));
    }

    #[test]
    fn empty_or_unknown_defaults_to_desktop() {
        for ua in ["", "   ", "curl/8.4.0", "definitely not a browser"] {
            let descriptor = classify(ua);
            assert_eq!(descriptor.family, "", "ua: {ua}");
            assert_eq!(descriptor.device, DeviceClass::Desktop, "ua: {ua}");
            assert_eq!(descriptor.version, None, "ua: {ua}");
        }
    }

    #[test]
    fn deterministic_for_same_input() {
        assert_eq!(classify(CHROME_ANDROID), classify(CHROME_ANDROID));
    }
}
