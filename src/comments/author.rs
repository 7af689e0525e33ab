//! Comment author identity: provider nickname with a local fallback that cannot fail.

use super::plan::FrozenContext;
use crate::content::slugify;
use crate::provider::{ProviderGateway, ProviderResult};
use rand::Rng;
use tracing::debug;

pub const NICKNAME_POOL: &[&str] = &[
    "PixelDrifter",
    "QuietByte",
    "NeonQuill",
    "ByteSailor",
    "LunaCoder",
    "StaticFox",
    "NightOwlDev",
    "CloudMarta",
];

/// `prefix + [10, 999]` when a prefix is set, otherwise a pool name + `[1, 99]`.
pub fn fallback_nickname<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> String {
    let prefix = prefix.trim();
    if !prefix.is_empty() {
        return format!("{}{}", prefix, rng.gen_range(10..=999));
    }
    let name = NICKNAME_POOL[rng.gen_range(0..NICKNAME_POOL.len())];
    format!("{}{}", name, rng.gen_range(1..=99))
}

/// Ask the gateway first; fall back locally on `Empty` or `Failure`.
pub async fn resolve_author<R: Rng + ?Sized>(
    gateway: &ProviderGateway,
    context: &FrozenContext,
    prefix: &str,
    rng: &parking_lot::Mutex<R>,
) -> String {
    match gateway.generate_nickname(context).await {
        ProviderResult::Success(nickname) => nickname,
        ProviderResult::Empty | ProviderResult::Failure(_) => {
            let nickname = fallback_nickname(prefix, &mut *rng.lock());
            debug!(nickname = %nickname, "Using fallback nickname");
            nickname
        }
    }
}

/// Synthetic author address: `slug(author)+<random hex>@host`.
pub fn author_email<R: Rng + ?Sized>(author: &str, host: &str, rng: &mut R) -> String {
    let local = slugify(author);
    let local = if local.is_empty() { "reader".to_string() } else { local };
    let tag: [u8; 6] = rng.gen();
    format!("{}+{}@{}", local, hex::encode(tag), host)
}
