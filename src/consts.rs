//! Project-wide constants.

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

pub const TRAVELPAYOUTS_API_URL: &str = "https://api.travelpayouts.com";
pub const AMADEUS_API_URL: &str = "https://test.api.amadeus.com";
pub const OPENAI_API_URL: &str = "https://api.openai.com";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const UNSPLASH_API_URL: &str = "https://api.unsplash.com";
pub const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org";
pub const AVIASALES_URL: &str = "https://www.aviasales.com";

/// Default chat model when `OPENAI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Days from today to the outbound and return flights.
pub const DEPARTURE_OFFSET_DAYS: i64 = 7;
pub const RETURN_OFFSET_DAYS: i64 = 14;

/// How many offers to hand to the copywriter.
pub const OFFER_LIMIT: u32 = 10;

/// Posts per channel per run when the channel doesn't say.
pub const DEFAULT_IDEAS: u8 = 1;
pub const MAX_IDEAS: u8 = 5;

/// Ideas asked of the model even when fewer are posted, so composing can
/// drop bad ones and still fill the channel.
pub const CANDIDATE_IDEAS: u8 = 3;

/// Hotels shown per post, and hotel ids passed to one offers search.
pub const HOTEL_LIMIT: usize = 3;
pub const HOTEL_ID_LIMIT: usize = 20;

/// Per-request HTTP timeout when `HTTP_TIMEOUT_SECS` is unset.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Telegram caps photo captions at 1024 characters and text at 4096.
pub const CAPTION_LIMIT: usize = 1024;
pub const MESSAGE_LIMIT: usize = 4096;

/// Environment variable holding the JSON channel payload for `--from-env`.
pub const CHANNELS_ENV: &str = "CHANNELS_CONFIG";
