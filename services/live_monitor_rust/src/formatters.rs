use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::time::Duration;
use tippzone_rust_core::models::{
    CanonicalEvent, CardKind, EventCategory, GoalKind, MatchPhase, ScorePair, Side,
};

const UNKNOWN_PLAYER: &str = "Ismeretlen";
const UNKNOWN_TEAM: &str = "ismeretlen csapat";
const UNKNOWN_LEAGUE: &str = "Ismeretlen liga";

/// Everything about the match a message needs besides the event itself
#[derive(Debug, Clone)]
pub struct MessageContext<'a> {
    pub home: &'a str,
    pub away: &'a str,
    pub league: Option<&'a str>,
    pub kickoff: Option<&'a str>,
    pub timezone: Tz,
}

pub fn render(event: &CanonicalEvent, ctx: &MessageContext<'_>, score: Option<ScorePair>) -> String {
    let mut out = String::new();
    out.push_str(header(event.category));
    out.push('\n');
    out.push_str(&format!(
        "📆 {}\n",
        format_kickoff_date(ctx.kickoff, ctx.timezone)
    ));
    out.push_str(&format!("🏆 {}\n", ctx.league.unwrap_or(UNKNOWN_LEAGUE)));

    match (event.category, score) {
        (EventCategory::Goal(_), Some(score)) => out.push_str(&format!(
            "🆚 {} {}–{} {}\n",
            ctx.home, score.home, score.away, ctx.away
        )),
        _ => out.push_str(&format!("🆚 {} vs {}\n", ctx.home, ctx.away)),
    }

    out.push_str(&format!("⏱️ {}\n", format_minute(event)));
    out.push_str(&attribution_line(event, ctx));
    out
}

fn header(category: EventCategory) -> &'static str {
    match category {
        EventCategory::Goal(_) => "⚽ GÓL!",
        EventCategory::Card(CardKind::Yellow) => "🟨 SÁRGA LAP!",
        EventCategory::Card(CardKind::Red) => "🟥 PIROS LAP!",
        EventCategory::Card(CardKind::SecondYellow) => "🟨🟥 MÁSODIK SÁRGA LAP!",
    }
}

/// `23. perc`, `45+2. perc`, `Hosszabbítás: 105. perc`, or the shoot-out literal
pub fn format_minute(event: &CanonicalEvent) -> String {
    let clock = match event.extra_minute {
        Some(extra) if extra > 0 => format!("{}+{}", event.minute, extra),
        _ => event.minute.to_string(),
    };
    match event.phase {
        MatchPhase::Shootout => "Büntetőpárbaj".to_string(),
        MatchPhase::ExtraTime => format!("Hosszabbítás: {clock}. perc"),
        MatchPhase::FirstHalf | MatchPhase::SecondHalf => format!("{clock}. perc"),
    }
}

fn attribution_line(event: &CanonicalEvent, ctx: &MessageContext<'_>) -> String {
    let player = event.player_name.as_deref().unwrap_or(UNKNOWN_PLAYER);
    let team = event.team.name().unwrap_or(UNKNOWN_TEAM);
    let mut line = format!("👤 {player} ({team})");

    match event.category {
        EventCategory::Goal(GoalKind::Penalty) => line.push_str(" · tizenegyesből"),
        EventCategory::Goal(GoalKind::OwnGoal) => {
            line.push_str(" · öngól");
            let credited = event.credited_side().map(|side| match side {
                Side::Home => ctx.home,
                Side::Away => ctx.away,
            });
            if let Some(credited) = credited {
                line.push_str(&format!(", {credited} javára"));
            }
        }
        _ => {}
    }
    line
}

pub fn hungarian_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "hétfő",
        Weekday::Tue => "kedd",
        Weekday::Wed => "szerda",
        Weekday::Thu => "csütörtök",
        Weekday::Fri => "péntek",
        Weekday::Sat => "szombat",
        Weekday::Sun => "vasárnap",
    }
}

/// Provider kickoff times come either as RFC 3339 or as a naive UTC
/// `YYYY-MM-DD HH:MM:SS`.
pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `2026-10-16 (péntek)` in the display timezone. Without a kickoff the
/// current date is used; an unparsable one is shown as given.
pub fn format_kickoff_date(kickoff: Option<&str>, tz: Tz) -> String {
    let utc = match kickoff {
        Some(raw) => match parse_kickoff(raw) {
            Some(dt) => dt,
            None => return raw.to_string(),
        },
        None => Utc::now(),
    };
    let local = utc.with_timezone(&tz);
    format!(
        "{} ({})",
        local.format("%Y-%m-%d"),
        hungarian_weekday(local.weekday())
    )
}

/// Channel announcement sent once at startup
pub fn render_startup_message(poll_interval: Duration, league_count: usize) -> String {
    let mut out = String::new();
    out.push_str("🚀 TippZone Live Bot elindult!\n\n");
    out.push_str("⚽ Gólok automatikus értesítése\n");
    out.push_str("🟨 Sárga lapok követése\n");
    out.push_str("🟥 Piros lapok követése\n");
    out.push_str(&format!(
        "🔄 {} másodperces frissítés\n",
        poll_interval.as_secs().max(1)
    ));
    out.push_str(&format!("🏆 {league_count} liga figyelése\n\n"));
    out.push_str("Bot aktív és készen áll! 🎯");
    out
}
