use rand::Rng;

/// Fingerprint configuration for anti-detection.
///
/// A fresh fingerprint is picked per browser session so repeated runs do
/// not present an identical client identity.
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timezone: String,
    pub locale: String,
}

/// Common desktop user agents, grouped loosely by browser family.
const USER_AGENTS: &[&str] = &[
    // Chrome
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    // Firefox
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0",
];

const VIEWPORTS: &[(u32, u32)] = &[(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

impl FingerprintConfig {
    /// Generate a randomized fingerprint configuration.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        let ua_idx = rng.gen_range(0..USER_AGENTS.len());
        let vp_idx = rng.gen_range(0..VIEWPORTS.len());
        let (width, height) = VIEWPORTS[vp_idx];

        Self {
            user_agent: USER_AGENTS[ua_idx].to_string(),
            viewport_width: width,
            viewport_height: height,
            timezone: "America/New_York".to_string(),
            locale: "en-US".to_string(),
        }
    }

    /// Generate a fingerprint suited to a specific site.
    ///
    /// Some retailers behave better with particular browser families; the
    /// pool is filtered accordingly, falling back to the whole pool when
    /// there is no preference for the site.
    pub fn for_site(site: &str) -> Self {
        let family = match site {
            "walmart" | "target" | "bestbuy" | "best-buy" => Some("Chrome/"),
            "amazon" => Some("Firefox/"),
            _ => None,
        };

        let mut fingerprint = Self::randomized();

        if let Some(marker) = family {
            let pool: Vec<&&str> = USER_AGENTS
                .iter()
                .filter(|ua| ua.contains(marker))
                .collect();
            if !pool.is_empty() {
                let mut rng = rand::thread_rng();
                fingerprint.user_agent = pool[rng.gen_range(0..pool.len())].to_string();
            }
        }

        fingerprint
    }
}
