//! User-agent classification into browser and device categories.

use crate::domain::entities::UNKNOWN;
use woothee::parser::Parser;

pub const DEVICE_DESKTOP: &str = "Desktop";
pub const DEVICE_MOBILE: &str = "Mobile";
pub const DEVICE_TABLET: &str = "Tablet";
pub const DEVICE_BOT: &str = "Bot";
pub const DEVICE_OTHER: &str = "Other";

/// Browser and device categories derived from a `User-Agent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser: String,
    pub device: String,
}

impl UserAgentInfo {
    fn unknown() -> Self {
        Self {
            browser: UNKNOWN.to_string(),
            device: UNKNOWN.to_string(),
        }
    }
}

/// Classifies a user-agent string. Missing or unrecognised agents map to
/// [`UNKNOWN`] for both fields.
pub fn classify_user_agent(user_agent: Option<&str>) -> UserAgentInfo {
    let Some(ua) = user_agent.map(str::trim).filter(|s| !s.is_empty()) else {
        return UserAgentInfo::unknown();
    };

    let Some(result) = Parser::new().parse(ua) else {
        return UserAgentInfo::unknown();
    };

    let browser = match &*result.name {
        "" | "UNKNOWN" => UNKNOWN.to_string(),
        name => name.to_string(),
    };

    let os = &*result.os;
    let device = match &*result.category {
        _ if os == "iPad" => DEVICE_TABLET,
        "smartphone" | "mobilephone" if os == "Android" && !ua.contains("Mobile") => DEVICE_TABLET,
        "smartphone" | "mobilephone" => DEVICE_MOBILE,
        "pc" => DEVICE_DESKTOP,
        "crawler" => DEVICE_BOT,
        "appliance" | "misc" => DEVICE_OTHER,
        _ => UNKNOWN,
    };

    UserAgentInfo {
        browser,
        device: device.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const GOOGLEBOT: &str =
        "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    #[test]
    fn test_desktop_chrome() {
        let info = classify_user_agent(Some(CHROME_WINDOWS));
        assert_eq!(info.browser, "Chrome");
        assert_eq!(info.device, DEVICE_DESKTOP);
    }

    #[test]
    fn test_iphone_is_mobile() {
        let info = classify_user_agent(Some(SAFARI_IPHONE));
        assert_eq!(info.browser, "Safari");
        assert_eq!(info.device, DEVICE_MOBILE);
    }

    #[test]
    fn test_ipad_is_tablet() {
        assert_eq!(classify_user_agent(Some(SAFARI_IPAD)).device, DEVICE_TABLET);
    }

    #[test]
    fn test_crawler_is_bot() {
        assert_eq!(classify_user_agent(Some(GOOGLEBOT)).device, DEVICE_BOT);
    }

    #[test]
    fn test_missing_or_garbage_is_unknown() {
        assert_eq!(classify_user_agent(None), UserAgentInfo::unknown());
        assert_eq!(classify_user_agent(Some("   ")), UserAgentInfo::unknown());
        assert_eq!(
            classify_user_agent(Some("definitely not a browser")),
            UserAgentInfo::unknown()
        );
    }
}
