use chrono::{DateTime, Local, TimeZone};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

const SUFFIX_LEN: usize = 8;
const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Fresh build name: `{plugin}_{YYYYmmddHHMMSS}_{8 chars of [a-z0-9]}`, lowercased.
pub fn create(plugin: &str) -> String {
    create_with(plugin, Local::now(), &mut rand::thread_rng())
}

pub fn create_with<Tz, R>(plugin: &str, now: DateTime<Tz>, rng: &mut R) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
    R: Rng + ?Sized,
{
    let pick = Uniform::from(0..SUFFIX_CHARSET.len());
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[pick.sample(rng)] as char)
        .collect();

    format!("{}_{}_{}", plugin, now.format("%Y%m%d%H%M%S"), suffix).to_lowercase()
}
