use crate::error::FetchError;
use crate::models::{
    Contestant, LineupEntry, MatchClock, MatchSnapshot, MatchStatistics, MatchStatus, Period,
    RawSubEvent, ScorePair, Side, SideStats, SubEventType,
};
use crate::providers::SnapshotSource;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.sportmonks.com/v3/football";

/// Related entities requested with every in-play fetch
const LIVE_INCLUDES: &str = "participants;state;events;league;lineups;statistics;periods;scores";

/// Statistic type ids requested from the provider
pub const STAT_SHOTS: i64 = 42;
pub const STAT_SHOTS_ON_TARGET: i64 = 34;
pub const STAT_CORNERS: i64 = 41;
pub const STAT_YELLOW_CARDS: i64 = 47;
const STAT_TYPE_IDS: [i64; 4] = [STAT_SHOTS, STAT_SHOTS_ON_TARGET, STAT_CORNERS, STAT_YELLOW_CARDS];

#[derive(Clone)]
pub struct SportMonksClient {
    client: Client,
    base_url: String,
    api_token: String,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for SportMonksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SportMonksClient")
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.retry.max_attempts)
            .finish()
    }
}

// ============================================================================
// Wire types (only the fields we read)
// ============================================================================

#[derive(Debug, Deserialize)]
struct LiveResponse {
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    rate_limit: Option<RateLimitDto>,
}

#[derive(Debug, Deserialize)]
struct RateLimitDto {
    remaining: Option<i64>,
    resets_in_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FixtureDto {
    id: i64,
    league_id: Option<i64>,
    starting_at: Option<String>,
    participants: Option<Vec<ParticipantDto>>,
    state: Option<StateDto>,
    events: Option<Vec<serde_json::Value>>,
    lineups: Option<Vec<serde_json::Value>>,
    league: Option<LeagueDto>,
    statistics: Option<Vec<StatisticDto>>,
    periods: Option<Vec<PeriodDto>>,
    scores: Option<Vec<ScoreDto>>,
}

#[derive(Debug, Deserialize)]
struct ParticipantDto {
    id: i64,
    name: Option<String>,
    meta: Option<ParticipantMetaDto>,
}

#[derive(Debug, Deserialize)]
struct ParticipantMetaDto {
    location: Option<String>,
    score: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StateDto {
    state: Option<String>,
    developer_name: Option<String>,
    minute: Option<u32>,
    extra_minute: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EventDto {
    id: i64,
    type_id: Option<i64>,
    participant_id: Option<i64>,
    team_id: Option<i64>,
    player_id: Option<i64>,
    player_name: Option<String>,
    team_name: Option<String>,
    location: Option<String>,
    minute: Option<u32>,
    extra_minute: Option<u32>,
    result: Option<String>,
    addition: Option<String>,
    rescinded: Option<bool>,
    section: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineupDto {
    player_id: Option<i64>,
    team_id: Option<i64>,
    player_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeagueDto {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatisticDto {
    type_id: i64,
    location: Option<String>,
    data: Option<StatisticDataDto>,
}

#[derive(Debug, Deserialize)]
struct StatisticDataDto {
    value: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PeriodDto {
    ticking: Option<bool>,
    minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ScoreDto {
    description: Option<String>,
    score: Option<ScoreValueDto>,
}

#[derive(Debug, Deserialize)]
struct ScoreValueDto {
    goals: Option<u32>,
    participant: Option<String>,
}

impl SportMonksClient {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.into(),
            api_token: api_token.into(),
            retry: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// In-play endpoint with participants, clock, events, lineups, league and statistics
    pub fn live_url(&self) -> String {
        let stat_filters = STAT_TYPE_IDS
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/livescores/inplay?api_token={}&include={}&filters=statisticTypes:{}",
            self.base_url.trim_end_matches('/'),
            self.api_token,
            LIVE_INCLUDES,
            stat_filters
        )
    }

    async fn fetch_once(&self) -> Result<Vec<MatchSnapshot>, FetchError> {
        let resp = self.client.get(self.live_url()).send().await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        parse_live_response(&body)
    }
}

#[async_trait]
impl SnapshotSource for SportMonksClient {
    async fn fetch_live(&self) -> Result<Vec<MatchSnapshot>, FetchError> {
        let snapshots = self
            .retry
            .execute(self.sleeper.as_ref(), || self.fetch_once())
            .await?;
        info!("Live matches fetched: {}", snapshots.len());
        Ok(snapshots)
    }

    fn provider_name(&self) -> &str {
        "sportmonks"
    }
}

/// Parse an in-play response body. A fixture, event or lineup entry that fails
/// to decode is skipped with a warning instead of failing the whole payload.
pub fn parse_live_response(body: &str) -> Result<Vec<MatchSnapshot>, FetchError> {
    let parsed: LiveResponse = serde_json::from_str(body)?;

    if let Some(rate_limit) = &parsed.rate_limit {
        debug!(
            "Rate limit remaining: {} (resets in {}s)",
            rate_limit
                .remaining
                .map(|r| r.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            rate_limit.resets_in_seconds.unwrap_or(0)
        );
    }

    let Some(fixtures) = parsed.data else {
        warn!("No live match data in provider response");
        return Ok(Vec::new());
    };

    let mut snapshots = Vec::with_capacity(fixtures.len());
    for raw in fixtures {
        match serde_json::from_value::<FixtureDto>(raw) {
            Ok(dto) => snapshots.push(into_snapshot(dto)),
            Err(e) => warn!("Skipping undecodable fixture: {}", e),
        }
    }
    Ok(snapshots)
}

fn into_snapshot(dto: FixtureDto) -> MatchSnapshot {
    let participants = dto.participants.unwrap_or_default();

    let contestants: Vec<Contestant> = participants
        .iter()
        .filter_map(|p| {
            let side = p
                .meta
                .as_ref()
                .and_then(|m| m.location.as_deref())
                .and_then(Side::from_location)?;
            Some(Contestant {
                id: p.id,
                name: p.name.clone().unwrap_or_else(|| "Ismeretlen".to_string()),
                side,
            })
        })
        .collect();

    let score = current_score(dto.scores.as_deref().unwrap_or_default())
        .unwrap_or_else(|| meta_score(&participants));

    let state = dto.state.as_ref();
    let status_code = state
        .and_then(|s| s.developer_name.clone().or_else(|| s.state.clone()))
        .unwrap_or_default();
    let ticking_minute = dto
        .periods
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|p| p.ticking.unwrap_or(false))
        .and_then(|p| p.minutes);

    let clock = MatchClock {
        minute: state.and_then(|s| s.minute).or(ticking_minute),
        extra_minute: state.and_then(|s| s.extra_minute),
        period: Period::from_state_code(&status_code),
        status: MatchStatus::new(status_code),
    };

    let events = decode_each::<EventDto>(dto.id, "event", dto.events.unwrap_or_default())
        .into_iter()
        .map(|e| {
            let outcome = [e.result, e.addition]
                .into_iter()
                .flatten()
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>();
            RawSubEvent {
                id: e.id,
                event_type: SubEventType::from_code(e.type_id.unwrap_or(0)),
                minute: e.minute.unwrap_or(0),
                extra_minute: e.extra_minute,
                result: (!outcome.is_empty()).then(|| outcome.join(" ")),
                rescinded: e.rescinded.unwrap_or(false),
                section: e.section,
                team_id: e.team_id,
                participant_id: e.participant_id,
                location: e.location,
                player_id: e.player_id,
                player_name: e.player_name,
                team_name: e.team_name,
            }
        })
        .collect();

    let lineups = decode_each::<LineupDto>(dto.id, "lineup entry", dto.lineups.unwrap_or_default())
        .into_iter()
        .filter_map(|l| {
            Some(LineupEntry {
                player_id: l.player_id,
                player_name: l.player_name,
                team_id: l.team_id?,
            })
        })
        .collect();

    MatchSnapshot {
        match_id: dto.id,
        league_id: dto.league_id,
        league_name: dto.league.and_then(|l| l.name),
        starting_at: dto.starting_at,
        contestants,
        score,
        clock,
        events,
        lineups,
        statistics: extract_statistics(dto.statistics.as_deref().unwrap_or_default()),
    }
}

fn decode_each<T: DeserializeOwned>(fixture_id: i64, kind: &str, raw: Vec<serde_json::Value>) -> Vec<T> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Fixture {}: skipping undecodable {}: {}", fixture_id, kind, e);
                None
            }
        })
        .collect()
}

fn current_score(scores: &[ScoreDto]) -> Option<ScorePair> {
    let mut pair = ScorePair::default();
    let mut found = false;
    for s in scores {
        if s.description.as_deref() != Some("CURRENT") {
            continue;
        }
        let Some(value) = &s.score else { continue };
        let goals = value.goals.unwrap_or(0);
        match value.participant.as_deref().and_then(Side::from_location) {
            Some(Side::Home) => pair.home = goals,
            Some(Side::Away) => pair.away = goals,
            None => continue,
        }
        found = true;
    }
    found.then_some(pair)
}

fn meta_score(participants: &[ParticipantDto]) -> ScorePair {
    let mut pair = ScorePair::default();
    for p in participants {
        let Some(meta) = &p.meta else { continue };
        let score = meta.score.unwrap_or(0);
        match meta.location.as_deref().and_then(Side::from_location) {
            Some(Side::Home) => pair.home = score,
            Some(Side::Away) => pair.away = score,
            None => {}
        }
    }
    pair
}

fn extract_statistics(stats: &[StatisticDto]) -> MatchStatistics {
    let mut out = MatchStatistics::default();
    for stat in stats {
        // the provider omits location on some home-side rows
        let side = stat
            .location
            .as_deref()
            .and_then(Side::from_location)
            .unwrap_or(Side::Home);
        let Some(value) = stat
            .data
            .as_ref()
            .and_then(|d| d.value.as_ref())
            .and_then(|v| v.as_u64())
        else {
            continue;
        };
        let target: &mut SideStats = match side {
            Side::Home => &mut out.home,
            Side::Away => &mut out.away,
        };
        let value = u32::try_from(value).unwrap_or(u32::MAX);
        match stat.type_id {
            STAT_SHOTS => target.shots = value,
            STAT_SHOTS_ON_TARGET => target.shots_on_target = value,
            STAT_CORNERS => target.corners = value,
            STAT_YELLOW_CARDS => target.yellow_cards = value,
            _ => {}
        }
    }
    out
}
