//! Turning offers and AI copy into publishable travel ideas.

pub mod message;

use std::collections::HashSet;

use crate::clients::{FlightOffer, HotelOffer, IdeaCopy};
use crate::consts::AVIASALES_URL;

pub use message::{escape_html, format_message, to_post};

/// A post-ready idea. Price and dates come from `offer`, never from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelIdea {
    pub title: String,
    pub motivation: String,
    pub description: String,
    pub origin_city: String,
    pub destination_city: String,
    pub offer: FlightOffer,
    pub booking_link: String,
    /// English place name for photo lookups, or the IATA code.
    pub place_name: String,
    pub photo_url: Option<String>,
    /// `None` when hotels were not looked up, empty when none were found.
    pub hotels: Option<Vec<HotelOffer>>,
}

impl TravelIdea {
    /// What to search photo sources for. `destination_city` is in the
    /// channel's language, which photo sources may not understand.
    pub fn photo_query(&self) -> &str {
        &self.place_name
    }
}

/// Pair each piece of copy with the offer it names.
///
/// Copy for a destination that wasn't offered is dropped, as is a second
/// idea for a destination already used. At most `limit` ideas are returned.
pub fn compose(
    offers: &[FlightOffer],
    copies: Vec<IdeaCopy>,
    marker: Option<&str>,
    limit: usize,
) -> Vec<TravelIdea> {
    let mut used = HashSet::new();
    let mut ideas = Vec::new();

    for copy in copies {
        if ideas.len() >= limit {
            break;
        }
        let code = copy.destination_code.trim().to_ascii_uppercase();
        let Some(offer) = cheapest_to(offers, &code) else {
            tracing::warn!(destination = %code, title = %copy.title, "dropping idea for a destination that was not offered");
            continue;
        };
        if !used.insert(code.clone()) {
            tracing::debug!(destination = %code, "dropping duplicate destination");
            continue;
        }

        ideas.push(TravelIdea {
            title: copy.title.trim().to_string(),
            motivation: copy.motivation.trim().to_string(),
            description: copy.description.trim().to_string(),
            origin_city: or_code(&copy.origin_city, &offer.origin),
            destination_city: or_code(&copy.destination_city, &offer.destination),
            booking_link: booking_link(offer, marker),
            place_name: or_code(&copy.destination_name_en, &offer.destination),
            offer: offer.clone(),
            photo_url: None,
            hotels: None,
        });
    }

    ideas
}

fn cheapest_to<'a>(offers: &'a [FlightOffer], code: &str) -> Option<&'a FlightOffer> {
    offers
        .iter()
        .filter(|offer| offer.destination.eq_ignore_ascii_case(code))
        .min_by(|a, b| a.price.cmp(&b.price))
}

fn or_code(city: &str, code: &str) -> String {
    let city = city.trim();
    if city.is_empty() {
        code.to_string()
    } else {
        city.to_string()
    }
}

/// Where readers book the offer, with the affiliate marker if there is one.
///
/// Uses the provider's deep link when present, otherwise builds an Aviasales
/// search link like `/search/TLV0106ATH08061`.
pub fn booking_link(offer: &FlightOffer, marker: Option<&str>) -> String {
    let link = match offer.link.as_deref().map(str::trim) {
        Some(link) if link.starts_with("http://") || link.starts_with("https://") => {
            link.to_string()
        }
        Some(link) if !link.is_empty() => {
            format!("{}/{}", AVIASALES_URL, link.trim_start_matches('/'))
        }
        _ => search_link(offer),
    };

    match marker.map(str::trim).filter(|m| !m.is_empty()) {
        Some(marker) => {
            let sep = if link.contains('?') { '&' } else { '?' };
            format!("{link}{sep}marker={marker}")
        }
        None => link,
    }
}

fn search_link(offer: &FlightOffer) -> String {
    let back = offer
        .return_date
        .map(|d| d.format("%d%m").to_string())
        .unwrap_or_default();
    format!(
        "{}/search/{}{}{}{}1",
        AVIASALES_URL,
        offer.origin,
        offer.departure_date.format("%d%m"),
        offer.destination,
        back
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::mock::{sample_copy, sample_offer};

    #[test]
    fn matches_copy_to_offers() {
        let offers = vec![sample_offer("ATH", 120), sample_offer("BCN", 150)];
        let ideas = compose(&offers, vec![sample_copy("BCN")], None, 5);

        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].offer.destination, "BCN");
        assert_eq!(ideas[0].title, "Escape to BCN");
        assert_eq!(ideas[0].destination_city, "City of BCN");
    }

    #[test]
    fn drops_unknown_destinations() {
        let offers = vec![sample_offer("ATH", 120)];
        let ideas = compose(&offers, vec![sample_copy("XXX"), sample_copy("ath")], None, 5);

        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].offer.destination, "ATH");
    }

    #[test]
    fn drops_duplicate_destinations_and_respects_limit() {
        let offers = vec![
            sample_offer("ATH", 120),
            sample_offer("BCN", 150),
            sample_offer("ROM", 90),
        ];
        let copies = vec![
            sample_copy("ATH"),
            sample_copy("ATH"),
            sample_copy("BCN"),
            sample_copy("ROM"),
        ];
        let ideas = compose(&offers, copies, None, 2);

        let codes: Vec<_> = ideas.iter().map(|i| i.offer.destination.as_str()).collect();
        assert_eq!(codes, ["ATH", "BCN"]);
    }

    #[test]
    fn picks_cheapest_offer_for_destination() {
        let offers = vec![sample_offer("ATH", 200), sample_offer("ATH", 99)];
        let ideas = compose(&offers, vec![sample_copy("ATH")], None, 1);
        assert_eq!(ideas[0].offer.price.to_string(), "99");
    }

    #[test]
    fn missing_city_names_fall_back_to_codes() {
        let mut copy = sample_copy("ATH");
        copy.origin_city = String::new();
        copy.destination_city = "  ".to_string();
        let ideas = compose(&[sample_offer("ATH", 120)], vec![copy], None, 1);

        assert_eq!(ideas[0].origin_city, "TLV");
        assert_eq!(ideas[0].destination_city, "ATH");
    }

    #[test]
    fn photo_query_prefers_english_name_over_localized_city() {
        let mut copy = sample_copy("ATH");
        copy.destination_city = "Афины".to_string();
        copy.destination_name_en = " Athens ".to_string();
        let ideas = compose(&[sample_offer("ATH", 120)], vec![copy], None, 1);
        assert_eq!(ideas[0].photo_query(), "Athens");
        assert_eq!(ideas[0].destination_city, "Афины");

        let mut copy = sample_copy("ATH");
        copy.destination_city = "Афины".to_string();
        let ideas = compose(&[sample_offer("ATH", 120)], vec![copy], None, 1);
        assert_eq!(ideas[0].photo_query(), "ATH");
    }

    #[test]
    fn search_link_without_provider_link() {
        let offer = sample_offer("ATH", 120);
        assert_eq!(
            booking_link(&offer, None),
            "https://www.aviasales.com/search/TLV0106ATH08061"
        );
    }

    #[test]
    fn relative_provider_link_is_made_absolute() {
        let mut offer = sample_offer("ATH", 120);
        offer.link = Some("/search/TLV0106ATH08061?t=abc".to_string());
        assert_eq!(
            booking_link(&offer, Some("12345")),
            "https://www.aviasales.com/search/TLV0106ATH08061?t=abc&marker=12345"
        );
    }

    #[test]
    fn absolute_provider_link_keeps_host() {
        let mut offer = sample_offer("ATH", 120);
        offer.link = Some("https://book.example/x".to_string());
        assert_eq!(
            booking_link(&offer, Some("777")),
            "https://book.example/x?marker=777"
        );
    }

    #[test]
    fn blank_marker_is_ignored() {
        let offer = sample_offer("ATH", 120);
        assert!(!booking_link(&offer, Some(" ")).contains("marker"));
    }

    #[test]
    fn one_way_search_link() {
        let mut offer = sample_offer("ATH", 120);
        offer.return_date = None;
        assert_eq!(
            booking_link(&offer, None),
            "https://www.aviasales.com/search/TLV0106ATH1"
        );
    }
}
