use std::fmt::Write;

use crate::clients::{HotelOffer, Post};
use crate::consts::{CAPTION_LIMIT, MESSAGE_LIMIT};

use super::TravelIdea;

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render one idea as a Telegram HTML message.
///
/// A description too long for a single message is shortened; the travel
/// details and booking link are always kept intact.
pub fn format_message(idea: &TravelIdea) -> String {
    let mut description: String = idea.description.clone();
    let mut text = render(idea, &description);

    while text.chars().count() > MESSAGE_LIMIT && !description.is_empty() {
        let overflow = text.chars().count() - MESSAGE_LIMIT;
        let keep = description.chars().count().saturating_sub(overflow + 1);
        description = description.chars().take(keep).collect();
        if !description.is_empty() {
            description.push('…');
        }
        text = render(idea, &description);
    }

    text
}

fn render(idea: &TravelIdea, description: &str) -> String {
    let offer = &idea.offer;
    let mut text = String::new();

    let _ = writeln!(text, "<b>{}</b>", escape_html(&idea.title));
    if !idea.motivation.is_empty() {
        let _ = writeln!(text, "<i>{}</i>", escape_html(&idea.motivation));
    }
    text.push('\n');
    if !description.is_empty() {
        let _ = writeln!(text, "{}\n", escape_html(description));
    }

    let _ = writeln!(text, "<b>Travel details:</b>");
    let _ = writeln!(
        text,
        "📍 From: {} ({})",
        escape_html(&idea.origin_city),
        offer.origin
    );
    let _ = writeln!(
        text,
        "✈️ To: {} ({})",
        escape_html(&idea.destination_city),
        offer.destination
    );
    match offer.return_date {
        Some(back) => {
            let _ = writeln!(text, "📅 Dates: {} → {}", offer.departure_date, back);
        }
        None => {
            let _ = writeln!(text, "📅 Date: {}", offer.departure_date);
        }
    }
    let _ = writeln!(text, "💰 Price: {} {}", offer.price, offer.currency);
    let flight = match (&offer.airline, &offer.flight_number) {
        (Some(airline), Some(number)) => Some(format!("{airline} {number}")),
        (Some(airline), None) => Some(airline.clone()),
        (None, Some(number)) => Some(number.clone()),
        (None, None) => None,
    };
    if let Some(flight) = flight {
        let _ = writeln!(text, "🔢 Flight: {}", escape_html(&flight));
    }
    let _ = write!(
        text,
        "🔗 <a href=\"{}\">Book flight</a>",
        escape_html(&idea.booking_link)
    );

    if let Some(hotels) = &idea.hotels {
        text.push_str("\n\n");
        render_hotels(&mut text, hotels);
    }

    text
}

fn render_hotels(text: &mut String, hotels: &[HotelOffer]) {
    if hotels.is_empty() {
        text.push_str("⚠️ No hotel offers found.");
        return;
    }
    text.push_str("<b>🏨 Hotel options:</b>");
    for hotel in hotels {
        let _ = write!(text, "\n• {}", escape_html(&hotel.name));
        if let Some(rating) = &hotel.rating {
            let _ = write!(text, " ({}⭐)", escape_html(rating));
        }
        let _ = write!(text, "\n  💵 {} {}", hotel.total_price, hotel.currency);
    }
}

/// Build the post for an idea: a photo with caption when the text fits in a
/// caption, plain text otherwise.
pub fn to_post(idea: &TravelIdea) -> Post {
    let text = format_message(idea);
    let photo_url = idea
        .photo_url
        .clone()
        .filter(|_| text.chars().count() <= CAPTION_LIMIT);
    Post { text, photo_url }
}
