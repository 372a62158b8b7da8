//! Display helpers: markdown bodies and "5 minutes ago" timestamps.

use chrono::Duration;

use crate::api::{Comment, Time};

pub fn render_markdown_to_html(markdown: &str) -> String {
    use pulldown_cmark::{html, Options, Parser};
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Human phrase for the distance between `t` and `now`, eg. "an hour ago"
pub fn from_now(t: Time, now: Time) -> String {
    let delta = now - t;
    let phrase = humanize(if delta < Duration::zero() { -delta } else { delta });
    match delta < Duration::zero() {
        true => format!("in {phrase}"),
        false => format!("{phrase} ago"),
    }
}

fn round_div(n: i64, d: f64) -> i64 {
    (n as f64 / d).round() as i64
}

fn humanize(d: Duration) -> String {
    let secs = d.num_seconds();
    let mins = round_div(secs, 60.0);
    let hours = round_div(secs, 3600.0);
    let days = round_div(secs, 86400.0);
    match () {
        _ if secs < 45 => String::from("a few seconds"),
        _ if secs < 90 => String::from("a minute"),
        _ if mins < 45 => format!("{mins} minutes"),
        _ if mins < 90 => String::from("an hour"),
        _ if hours < 22 => format!("{hours} hours"),
        _ if hours < 36 => String::from("a day"),
        _ if days < 26 => format!("{days} days"),
        _ if days < 45 => String::from("a month"),
        _ if days < 320 => format!("{} months", round_div(days, 30.4).max(2)),
        _ if days < 548 => String::from("a year"),
        _ => format!("{} years", round_div(days, 365.0).max(2)),
    }
}

/// Timestamp shown next to a comment
pub fn comment_age(c: &Comment, now: Time) -> String {
    from_now(c.updated_at, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> Time {
        s.parse().expect("parsing time")
    }

    fn ago(secs: i64) -> String {
        let now = at("2020-06-01T12:00:00Z");
        from_now(now - Duration::seconds(secs), now)
    }

    #[test]
    fn relative_thresholds() {
        assert_eq!(ago(0), "a few seconds ago");
        assert_eq!(ago(44), "a few seconds ago");
        assert_eq!(ago(45), "a minute ago");
        assert_eq!(ago(89), "a minute ago");
        assert_eq!(ago(90), "2 minutes ago");
        assert_eq!(ago(5 * 60), "5 minutes ago");
        assert_eq!(ago(44 * 60), "44 minutes ago");
        assert_eq!(ago(45 * 60), "an hour ago");
        assert_eq!(ago(3 * 3600), "3 hours ago");
        assert_eq!(ago(23 * 3600), "a day ago");
        assert_eq!(ago(3 * 86400), "3 days ago");
        assert_eq!(ago(30 * 86400), "a month ago");
        assert_eq!(ago(90 * 86400), "3 months ago");
        assert_eq!(ago(400 * 86400), "a year ago");
        assert_eq!(ago(3 * 365 * 86400), "3 years ago");
    }

    #[test]
    fn future_times() {
        let now = at("2020-06-01T12:00:00Z");
        assert_eq!(from_now(now + Duration::hours(1), now), "in an hour");
    }

    #[test]
    fn markdown_is_rendered() {
        assert_eq!(
            render_markdown_to_html("You are __right!__"),
            "<p>You are <strong>right!</strong></p>\n",
        );
        assert!(render_markdown_to_html("~~gone~~").contains("<del>gone</del>"));
    }
}
