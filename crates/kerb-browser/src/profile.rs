use kerb_core::BrowserConfig;
use rand::Rng;

/// User agent and viewport the engine presents to the site.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl BrowserProfile {
    /// Profile taken straight from configuration.
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            viewport_width: config.window_width,
            viewport_height: config.window_height,
        }
    }

    /// Generate a randomized desktop profile.
    ///
    /// Some sites serve degraded markup to obvious bots; a plausible
    /// desktop profile keeps the audited page representative of what
    /// users actually receive.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        // Common desktop user agents
        let user_agents = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ];

        // Common viewport sizes
        let viewports = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

        let ua_idx = rng.gen_range(0..user_agents.len());
        let vp_idx = rng.gen_range(0..viewports.len());
        let (width, height) = viewports[vp_idx];

        Self {
            user_agent: user_agents[ua_idx].to_string(),
            viewport_width: width,
            viewport_height: height,
        }
    }

    /// Profile selection for an engine launch.
    pub fn select(config: &BrowserConfig) -> Self {
        if config.randomize_fingerprint {
            Self::randomized()
        } else {
            Self::from_config(config)
        }
    }
}
