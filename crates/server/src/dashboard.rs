//! JSON/SSE facade for the outreach workflow. Every mutating route goes
//! through the bearer-token policy in `security` and publishes its progress
//! on the event bus so `/stream` subscribers see one coherent feed.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, patch, post},
    Json, Router,
};
use concierge_core::{
    correlation_token, ApplicationError, Candidate, CandidateDraft, CandidateStatus,
    MeetingParameters, OutreachEvent, OutreachRun, ScheduledMeeting,
};
use concierge_outreach::{render_body, DemoSequencer, OutreachFlowEngine};
use concierge_providers::llm::heuristic_reply_analysis;
use concierge_providers::relay::SIGNATURE_HEADER;
use concierge_providers::{
    MeetingConfirmation, MeetingRequest, OutboundEmail, ProviderError, ReplyAnalysis, ReplyMessage,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{debug, warn};

use crate::bootstrap::AppState;
use crate::security::{self, AuthDenied};

const MAX_WINDOW_MINUTES: u64 = 7 * 24 * 60;
const DEFAULT_TOPIC: &str = "AI";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/run", post(start_run))
        .route("/stream", get(stream_events))
        .route("/candidates", get(list_candidates))
        .route("/candidates/load", post(load_candidates))
        .route("/speakers/find", post(find_speakers))
        .route("/candidates/{email}/status", patch(update_candidate_status))
        .route("/outreach/send", post(send_batch))
        .route("/outreach/check-replies", post(check_replies))
        .route("/outreach/schedule-on-reply", post(schedule_on_reply))
        .route("/outreach/run-flow", post(run_flow))
        .route("/outreach/send-individual", post(send_individual))
        .route("/outreach/check-response", post(check_response))
        .route("/outreach/schedule-meeting", post(schedule_meeting))
        .route("/webhooks/replies", post(receive_reply_webhook))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error plumbing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardError {
    pub error: String,
}

type Rejection = (StatusCode, Json<DashboardError>);

fn reject(status: StatusCode, message: impl Into<String>) -> Rejection {
    (status, Json(DashboardError { error: message.into() }))
}

fn bad_request(message: impl Into<String>) -> Rejection {
    reject(StatusCode::BAD_REQUEST, message)
}

fn run_conflict() -> Rejection {
    reject(StatusCode::CONFLICT, ApplicationError::RunInProgress.to_string())
}

fn provider_unavailable(error: &ProviderError) -> Rejection {
    reject(StatusCode::BAD_GATEWAY, error.to_string())
}

fn denied(denial: AuthDenied) -> Rejection {
    reject(denial.status, denial.reason)
}

// ---------------------------------------------------------------------------
// Run control
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
pub struct RunQuery {
    pub topic: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Acknowledged {
    pub ok: bool,
    pub status: &'static str,
}

fn flow_engine(state: &AppState) -> OutreachFlowEngine {
    OutreachFlowEngine::new(
        state.bus.clone(),
        state.registry.clone(),
        state.providers.email.clone(),
        state.providers.replies.clone(),
        state.providers.calendar.clone(),
    )
}

/// Kicks off the full source-contact-schedule flow in the background.
/// Offline mode replays the scripted demo instead; both paths speak the
/// same event vocabulary on `/stream`.
pub async fn start_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RunQuery>,
) -> Result<(StatusCode, Json<Acknowledged>), Rejection> {
    security::authorize(&state.config.auth, &headers, "outreach:run").map_err(denied)?;
    let Some(guard) = state.bus.try_begin_run() else {
        return Err(run_conflict());
    };
    let topic = query.topic.unwrap_or_else(|| DEFAULT_TOPIC.to_owned());

    if state.config.offline() {
        let sequencer = DemoSequencer::new(state.bus.clone(), state.registry.clone());
        tokio::spawn(async move { sequencer.run(&topic, guard).await });
    } else {
        tokio::spawn(async move {
            state.bus.publish(OutreachEvent::log(format!(
                "[SourcingAgent] Searching for candidates on: {topic}"
            )));
            match state.providers.search.search_candidates(&topic).await {
                Ok(drafts) => {
                    state.bus.publish(OutreachEvent::log(format!(
                        "[SourcingAgent] Found {} potential candidates.",
                        drafts.len()
                    )));
                    let run = OutreachRun {
                        candidates: drafts,
                        subject: state.config.outreach.default_subject.clone(),
                        body_template: state.config.outreach.default_body_template.clone(),
                        window: state.config.default_window(),
                        poll_interval: state.config.default_poll_interval(),
                        meeting: MeetingParameters::default(),
                    };
                    flow_engine(&state).run(run, guard).await;
                }
                Err(error) => {
                    warn!(event_name = "outreach.sourcing.failed", %error, "candidate search failed");
                    state
                        .bus
                        .publish(OutreachEvent::log(format!("[SourcingAgent] Search failed: {error}")));
                    state.bus.publish(OutreachEvent::done_ok(Vec::new()));
                    drop(guard);
                }
            }
        });
    }

    Ok((StatusCode::ACCEPTED, Json(Acknowledged { ok: true, status: "started" })))
}

pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let receiver = state.bus.subscribe();
    let stream = BroadcastStream::new(receiver)
        .filter_map(|event| event.ok())
        .map(|event| Event::default().event(event.kind()).json_data(event.payload()));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ---------------------------------------------------------------------------
// Candidate registry
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateList {
    pub ok: bool,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoadRequest {
    #[serde(default)]
    pub candidates: Vec<CandidateDraft>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadOutcome {
    pub ok: bool,
    pub count: usize,
    pub candidates: Vec<Candidate>,
}

pub async fn list_candidates(State(state): State<AppState>) -> Json<CandidateList> {
    Json(CandidateList { ok: true, candidates: state.registry.all() })
}

pub async fn load_candidates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoadRequest>,
) -> Result<Json<LoadOutcome>, Rejection> {
    security::authorize(&state.config.auth, &headers, "candidates:write").map_err(denied)?;

    let candidates = state.registry.load(&body.candidates);
    state.bus.publish(OutreachEvent::Candidates(candidates.clone()));
    Ok(Json(LoadOutcome { ok: true, count: candidates.len(), candidates }))
}

#[derive(Debug, Deserialize, Default)]
pub struct FindSpeakersRequest {
    pub topic: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FindSpeakersReport {
    pub ok: bool,
    pub candidates: Vec<CandidateDraft>,
}

/// Runs candidate sourcing on its own, without starting a flow or touching
/// the registry.
pub async fn find_speakers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<FindSpeakersRequest>,
) -> Result<Json<FindSpeakersReport>, Rejection> {
    security::authorize(&state.config.auth, &headers, "outreach:run").map_err(denied)?;

    let topic = body.topic.unwrap_or_else(|| DEFAULT_TOPIC.to_owned());
    let candidates = state
        .providers
        .search
        .search_candidates(&topic)
        .await
        .map_err(|error| provider_unavailable(&error))?;
    Ok(Json(FindSpeakersReport { ok: true, candidates }))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateOutcome {
    pub ok: bool,
    pub candidate: Candidate,
}

pub async fn update_candidate_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(email): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<CandidateOutcome>, Rejection> {
    security::authorize(&state.config.auth, &headers, "candidates:write").map_err(denied)?;

    let raw = body.status.as_deref().filter(|raw| !raw.is_empty());
    let Some(raw) = raw else {
        return Err(bad_request("status is required"));
    };
    let status = raw.parse::<CandidateStatus>().map_err(|error| bad_request(error.to_string()))?;

    let Some(candidate) = state.registry.update_status(&email, status) else {
        return Err(reject(StatusCode::NOT_FOUND, format!("no candidate with email {email}")));
    };
    state.bus.publish(OutreachEvent::status(&email, status));
    Ok(Json(CandidateOutcome { ok: true, candidate }))
}

// ---------------------------------------------------------------------------
// Batch outreach commands
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SendRequest {
    pub candidates: Vec<CandidateDraft>,
    pub subject: Option<String>,
    pub body_template: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub ok: bool,
    pub to: String,
    #[serde(rename = "refToken", skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SendReport {
    pub ok: bool,
    pub sent: Vec<SendOutcome>,
}

/// Sends the invitation, records the candidate as Contacted with their
/// correlation token, and mirrors both onto the event bus.
async fn send_invitation(
    state: &AppState,
    draft: &CandidateDraft,
    email: &str,
    subject: &str,
    body: String,
) -> Result<String, ProviderError> {
    let token = correlation_token(email, subject);
    let name = draft.name.as_deref().unwrap_or("there");
    state
        .providers
        .email
        .send_email(&OutboundEmail {
            to: email.to_owned(),
            subject: subject.to_owned(),
            body,
            correlation_token: token.clone(),
        })
        .await?;

    let mut contacted = draft.clone();
    contacted.status = Some(CandidateStatus::Contacted);
    state.registry.load(&[contacted]);
    state.registry.set_correlation_token(email, &token);
    state.bus.publish(OutreachEvent::status(email, CandidateStatus::Contacted));
    state.bus.publish(OutreachEvent::log(format!("[Outreach] Sent to {name} <{email}>")));
    Ok(token)
}

pub async fn send_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SendRequest>,
) -> Result<Json<SendReport>, Rejection> {
    security::authorize(&state.config.auth, &headers, "outreach:send").map_err(denied)?;

    if body.candidates.is_empty() {
        return Err(bad_request("candidates must not be empty"));
    }
    let subject =
        body.subject.unwrap_or_else(|| state.config.outreach.default_subject.clone());
    let template = body
        .body_template
        .unwrap_or_else(|| state.config.outreach.default_body_template.clone());

    let mut sent = Vec::with_capacity(body.candidates.len());
    for draft in &body.candidates {
        let Some(email) = draft.email.as_deref().filter(|email| !email.is_empty()) else {
            sent.push(SendOutcome {
                ok: false,
                to: draft.name.clone().unwrap_or_default(),
                correlation_token: None,
                error: Some("candidate has no email".to_owned()),
            });
            continue;
        };
        let rendered = render_body(&template, draft.name.as_deref().unwrap_or("there"));
        match send_invitation(&state, draft, email, &subject, rendered).await {
            Ok(token) => sent.push(SendOutcome {
                ok: true,
                to: email.to_owned(),
                correlation_token: Some(token),
                error: None,
            }),
            Err(error) => {
                warn!(event_name = "outreach.send.failed", to = %email, %error, "send failed");
                state
                    .bus
                    .publish(OutreachEvent::log(format!("[Outreach] Send failed for {email}")));
                sent.push(SendOutcome {
                    ok: false,
                    to: email.to_owned(),
                    correlation_token: None,
                    error: Some(error.to_string()),
                });
            }
        }
    }

    Ok(Json(SendReport { ok: true, sent }))
}

#[derive(Debug, Deserialize, Default)]
pub struct CheckRepliesRequest {
    #[serde(default)]
    pub refs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepliesReport {
    pub ok: bool,
    pub replies: BTreeMap<String, Vec<ReplyMessage>>,
}

pub async fn check_replies(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CheckRepliesRequest>,
) -> Result<Json<RepliesReport>, Rejection> {
    security::authorize(&state.config.auth, &headers, "outreach:send").map_err(denied)?;

    let mut replies = BTreeMap::new();
    for token in &body.refs {
        let found = state
            .providers
            .replies
            .search_replies(token)
            .await
            .map_err(|error| provider_unavailable(&error))?;
        replies.insert(token.clone(), found);
    }
    Ok(Json(RepliesReport { ok: true, replies }))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleTarget {
    pub email: Option<String>,
    pub ref_token: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleOnReplyRequest {
    pub candidates: Vec<ScheduleTarget>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "duration")]
    pub duration_minutes: Option<u32>,
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduleReport {
    pub ok: bool,
    pub scheduled: Vec<ScheduledMeeting>,
}

/// For each candidate whose reply lookup turns something up, creates the
/// meeting and marks them Accepted. Lookup and scheduling errors are logged
/// and skipped so one bad candidate never sinks the batch.
pub async fn schedule_on_reply(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ScheduleOnReplyRequest>,
) -> Result<Json<ScheduleReport>, Rejection> {
    security::authorize(&state.config.auth, &headers, "outreach:send").map_err(denied)?;

    let defaults = MeetingParameters::default();
    let summary = body.summary.unwrap_or(defaults.summary);
    let description = body.description.unwrap_or(defaults.description);
    let duration_minutes = body.duration_minutes.unwrap_or(defaults.duration_minutes);

    let mut scheduled = Vec::new();
    for target in &body.candidates {
        let (Some(email), Some(token)) = (target.email.as_deref(), target.ref_token.as_deref())
        else {
            continue;
        };
        let replies = match state.providers.replies.search_replies(token).await {
            Ok(replies) => replies,
            Err(error) => {
                warn!(event_name = "outreach.reply_lookup.failed", to = %email, %error, "reply lookup failed");
                continue;
            }
        };
        if replies.is_empty() {
            continue;
        }
        state
            .bus
            .publish(OutreachEvent::log(format!("[Outreach] Reply detected from {email}")));

        let request = MeetingRequest {
            attendees: vec![email.to_owned()],
            summary: summary.clone(),
            description: description.clone(),
            duration_minutes,
            timezone: body.timezone.clone(),
            selected_time: None,
        };
        match state.providers.calendar.schedule_meeting(&request).await {
            Ok(confirmation) => {
                state.registry.update_status(email, CandidateStatus::Accepted);
                state.bus.publish(OutreachEvent::status(email, CandidateStatus::Accepted));
                state.bus.publish(OutreachEvent::log(format!(
                    "[Scheduling] Meeting created for {email}"
                )));
                scheduled.push(ScheduledMeeting {
                    email: email.to_owned(),
                    event_id: confirmation.event_id,
                    meet_link: confirmation.meet_link,
                });
            }
            Err(error) => {
                warn!(event_name = "outreach.schedule.failed", to = %email, %error, "scheduling failed");
            }
        }
    }

    Ok(Json(ScheduleReport { ok: true, scheduled }))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RunFlowRequest {
    pub candidates: Vec<CandidateDraft>,
    pub subject: Option<String>,
    pub body_template: Option<String>,
    pub window_minutes: Option<u64>,
    pub poll_every_seconds: Option<u64>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "duration")]
    pub duration_minutes: Option<u32>,
    pub timezone: Option<String>,
}

/// Runs the full send-poll-schedule engine over the supplied candidates in
/// the background.
pub async fn run_flow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RunFlowRequest>,
) -> Result<(StatusCode, Json<Acknowledged>), Rejection> {
    security::authorize(&state.config.auth, &headers, "outreach:run").map_err(denied)?;

    let outreach = &state.config.outreach;
    let poll_secs = body.poll_every_seconds.unwrap_or(outreach.default_poll_interval_secs);
    if poll_secs < outreach.min_poll_interval_secs {
        return Err(bad_request(format!(
            "pollEverySeconds must be at least {}",
            outreach.min_poll_interval_secs
        )));
    }
    let window_minutes = body.window_minutes.unwrap_or(outreach.default_window_minutes);
    if window_minutes > MAX_WINDOW_MINUTES {
        return Err(bad_request(format!(
            "windowMinutes must be at most {MAX_WINDOW_MINUTES}"
        )));
    }

    let defaults = MeetingParameters::default();
    let run = OutreachRun {
        candidates: body.candidates,
        subject: body.subject.unwrap_or_else(|| outreach.default_subject.clone()),
        body_template: body
            .body_template
            .unwrap_or_else(|| outreach.default_body_template.clone()),
        window: Duration::from_secs(window_minutes * 60),
        poll_interval: Duration::from_secs(poll_secs),
        meeting: MeetingParameters {
            summary: body.summary.unwrap_or(defaults.summary),
            description: body.description.unwrap_or(defaults.description),
            duration_minutes: body.duration_minutes.unwrap_or(defaults.duration_minutes),
            timezone: body.timezone,
        },
    };

    let Some(guard) = state.bus.try_begin_run() else {
        return Err(run_conflict());
    };
    let engine = flow_engine(&state);
    tokio::spawn(async move {
        engine.run(run, guard).await;
    });

    Ok((StatusCode::ACCEPTED, Json(Acknowledged { ok: true, status: "started" })))
}

// ---------------------------------------------------------------------------
// Individual outreach commands
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SendIndividualRequest {
    pub candidate: Option<CandidateDraft>,
    pub subject: Option<String>,
    pub body_template: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndividualSendOutcome {
    pub ok: bool,
    pub to: String,
    #[serde(rename = "refToken")]
    pub correlation_token: String,
    pub subject: String,
    pub body: String,
}

/// Sends to a single candidate, asking the llm (when configured) to write
/// the message body and falling back to plain template rendering.
pub async fn send_individual(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SendIndividualRequest>,
) -> Result<Json<IndividualSendOutcome>, Rejection> {
    security::authorize(&state.config.auth, &headers, "outreach:send").map_err(denied)?;

    let Some(draft) = body.candidate else {
        return Err(bad_request("candidate is required"));
    };
    let Some(email) = draft.email.as_deref().filter(|email| !email.is_empty()) else {
        return Err(bad_request("candidate email is required"));
    };
    let subject =
        body.subject.unwrap_or_else(|| state.config.outreach.default_subject.clone());
    let template = body
        .body_template
        .unwrap_or_else(|| state.config.outreach.default_body_template.clone());
    let name = draft.name.as_deref().unwrap_or("there");

    let message = match &state.providers.llm {
        Some(llm) => {
            let prompt = format!(
                "Write a short, friendly invitation email to {name} (expertise: {expertise}) \
                 inviting them to judge a hackathon. Subject line: {subject}. Base it on this \
                 message: {template}. Respond with only the email body.",
                expertise = draft.expertise.as_deref().unwrap_or("unknown"),
            );
            match llm.complete(&prompt).await {
                Ok(text) => text,
                Err(error) => {
                    debug!(event_name = "outreach.personalization.fallback", %error, "llm personalization failed");
                    render_body(&template, name)
                }
            }
        }
        None => render_body(&template, name),
    };

    let token = send_invitation(&state, &draft, email, &subject, message.clone())
        .await
        .map_err(|error| provider_unavailable(&error))?;

    Ok(Json(IndividualSendOutcome {
        ok: true,
        to: email.to_owned(),
        correlation_token: token,
        subject,
        body: message,
    }))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckResponseRequest {
    pub ref_token: Option<String>,
    pub candidate_email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCheck {
    pub ok: bool,
    pub has_response: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<ReplyMessage>>,
    #[serde(flatten)]
    pub analysis: Option<ReplyAnalysis>,
}

pub async fn check_response(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CheckResponseRequest>,
) -> Result<Json<ResponseCheck>, Rejection> {
    security::authorize(&state.config.auth, &headers, "outreach:send").map_err(denied)?;

    let (Some(token), Some(email)) =
        (body.ref_token.as_deref(), body.candidate_email.as_deref())
    else {
        return Err(bad_request("refToken and candidateEmail are required"));
    };

    let replies = state
        .providers
        .replies
        .search_replies(token)
        .await
        .map_err(|error| provider_unavailable(&error))?;
    if replies.is_empty() {
        return Ok(Json(ResponseCheck {
            ok: true,
            has_response: false,
            replies: None,
            analysis: None,
        }));
    }
    state.bus.publish(OutreachEvent::log(format!("[Outreach] Reply detected from {email}")));

    let text = replies[0].snippet.clone();
    let analysis = match &state.providers.llm {
        Some(llm) => match llm.analyze_reply(&text).await {
            Ok(analysis) => analysis,
            Err(error) => {
                debug!(event_name = "llm.analysis.fallback", %error, "reply analysis failed");
                heuristic_reply_analysis(&text)
            }
        },
        None => heuristic_reply_analysis(&text),
    };

    Ok(Json(ResponseCheck {
        ok: true,
        has_response: true,
        replies: Some(replies),
        analysis: Some(analysis),
    }))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleMeetingRequest {
    pub candidate: Option<CandidateDraft>,
    pub selected_time: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "duration")]
    pub duration_minutes: Option<u32>,
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MeetingOutcome {
    pub ok: bool,
    pub email: String,
    #[serde(flatten)]
    pub confirmation: MeetingConfirmation,
}

pub async fn schedule_meeting(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ScheduleMeetingRequest>,
) -> Result<Json<MeetingOutcome>, Rejection> {
    security::authorize(&state.config.auth, &headers, "outreach:send").map_err(denied)?;

    let Some(draft) = body.candidate else {
        return Err(bad_request("candidate is required"));
    };
    let Some(email) = draft.email.as_deref().filter(|email| !email.is_empty()) else {
        return Err(bad_request("candidate email is required"));
    };
    let Some(selected_time) = body.selected_time.filter(|time| !time.is_empty()) else {
        return Err(bad_request("selectedTime is required"));
    };

    let defaults = MeetingParameters::default();
    let request = MeetingRequest {
        attendees: vec![email.to_owned()],
        summary: body.summary.unwrap_or(defaults.summary),
        description: body.description.unwrap_or(defaults.description),
        duration_minutes: body.duration_minutes.unwrap_or(defaults.duration_minutes),
        timezone: body.timezone,
        selected_time: Some(selected_time),
    };
    let confirmation = state
        .providers
        .calendar
        .schedule_meeting(&request)
        .await
        .map_err(|error| provider_unavailable(&error))?;

    if state.registry.update_status(email, CandidateStatus::Scheduled).is_none() {
        let mut scheduled = draft.clone();
        scheduled.status = Some(CandidateStatus::Scheduled);
        state.registry.load(&[scheduled]);
    }
    state.bus.publish(OutreachEvent::status(email, CandidateStatus::Scheduled));
    state
        .bus
        .publish(OutreachEvent::log(format!("[Scheduling] Meeting created for {email}")));

    Ok(Json(MeetingOutcome { ok: true, email: email.to_owned(), confirmation }))
}

// ---------------------------------------------------------------------------
// Inbound reply webhook
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplyWebhook {
    pub ref_token: Option<String>,
    pub id: Option<String>,
    pub snippet: Option<String>,
}

/// Receives reply notifications from the mail relay. The body is verified
/// against the shared webhook secret before anything is stored.
pub async fn receive_reply_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Acknowledged>, Rejection> {
    if let Some(secret) = &state.config.relay.webhook_secret {
        let provided =
            headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok()).unwrap_or("");
        if !security::verify_signature(secret, &body, provided) {
            return Err(reject(StatusCode::UNAUTHORIZED, "invalid webhook signature"));
        }
    }

    let payload: ReplyWebhook = serde_json::from_slice(&body)
        .map_err(|error| bad_request(format!("malformed webhook body: {error}")))?;
    let (Some(token), Some(snippet)) = (payload.ref_token, payload.snippet) else {
        return Err(bad_request("refToken and snippet are required"));
    };

    let id = payload.id.unwrap_or_else(|| format!("inbound-{token}"));
    state.mailbox.inject_reply(&token, ReplyMessage { id, snippet });
    debug!(event_name = "outreach.webhook.reply_stored", ref_token = %token, "inbound reply stored");

    Ok(Json(Acknowledged { ok: true, status: "accepted" }))
}
