//! Closed sets the site exposes: replay categories, cable providers offered by
//! the access picker, and the bitrate markers baked into manifest paths.

pub const LISTING_BASE_URL: &str = "https://www.nbcolympics.com/replays/sport/";

pub const SPORTS: &[&str] = &[
    "archery",
    "artistic-swimming",
    "badminton",
    "baseball",
    "basketball",
    "basketball-3x3",
    "beach-volleyball",
    "boxing",
    "canoe-kayak",
    "cycling",
    "diving",
    "equestrian",
    "fencing",
    "field-hockey",
    "golf",
    "gymnastics",
    "handball",
    "judo",
    "karate",
    "modern-pentathlon",
    "rhythmic-gymnastics",
    "rowing",
    "rugby",
    "sailing",
    "shooting",
    "skateboarding",
    "soccer",
    "softball",
    "sport-climbing",
    "surfing",
    "swimming",
    "table-tennis",
    "taekwondo",
    "tennis",
    "track-field",
    "trampoline",
    "triathlon",
    "volleyball",
    "water-polo",
    "weightlifting",
    "wrestling",
];

pub const CABLE_PROVIDERS: &[&str] = &[
    "comcast_sso",
    "dtv",
    "dish",
    "att",
    "verizon",
    "cox",
    "spectrum",
    "cablevision",
    "suddenlink",
    "mediacom",
    "auth_cableone_net",
    "wow",
    "rcn",
    "auth_armstrongmywire_com",
    "frontier_auth-gateway_net",
    "aafexch",
];

/// Resolution label paired with the numeric bitrate that appears in its manifest path.
pub const RESOLUTION_MARKERS: &[(&str, &str)] = &[("1080p", "6596000"), ("720p", "4596000")];

pub const AD_DOMAINS: &[&str] = &["fwmrm.net"];

pub const MANIFEST_URL_PATTERN: &str = r#"https://sprt[^\s"'<>]*?VIDEO_\d+_\d+_vod\.m3u8"#;

pub fn is_known_sport(id: &str) -> bool {
    SPORTS.contains(&id)
}

pub fn is_known_provider(id: &str) -> bool {
    CABLE_PROVIDERS.contains(&id)
}

pub fn listing_url(base: &str, sport: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{sport}")
    } else {
        format!("{base}/{sport}")
    }
}
