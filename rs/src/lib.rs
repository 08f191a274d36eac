pub mod core;
pub mod export;
pub mod feed;
pub mod location;
pub mod parser;
pub mod routing;
pub mod spatial;

use crate::core::config::{ProximityOptions, DEFAULT_FALLBACK_ORIGIN, DEFAULT_FALLBACK_SPEED_KMH};
use crate::core::errors::{LocationFailure, ProximityError};
use crate::core::types::{GeoPoint, Route};
use crate::feed::{ReportFilter, ViewSession};
use crate::location::ReportedPosition;
use crate::parser::{parse_reports_json, HttpReportSource};
use crate::routing::{fallback_route, OsrmDirections};
use crate::spatial::corridor::{reports_near_route, status_set};
use crate::spatial::geometry::distance_meters;
use crate::spatial::nearest::nearest_k;
use lazy_static::lazy_static;
use neon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;

struct AddonSession {
    view: ViewSession<HttpReportSource>,
    directions: OsrmDirections,
}

lazy_static! {
    static ref TOKIO_RUNTIME: Runtime = Runtime::new().expect("Failed to create Tokio runtime");
    static ref SESSIONS: Mutex<HashMap<i32, Arc<AddonSession>>> = Mutex::new(HashMap::new());
}

static NEXT_SESSION_ID: AtomicI32 = AtomicI32::new(1);

fn get_session(cx: &mut FunctionContext, session_id: i32) -> NeonResult<Arc<AddonSession>> {
    let found = SESSIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&session_id)
        .cloned();
    match found {
        Some(session) => Ok(session),
        None => cx.throw_error(ProximityError::SessionNotFound(session_id).to_string()),
    }
}

fn parse_json<T: DeserializeOwned>(cx: &mut FunctionContext, json: &str, what: &str) -> NeonResult<T> {
    match serde_json::from_str(json) {
        Ok(value) => Ok(value),
        Err(e) => cx.throw_error(format!("Invalid {} JSON: {}", what, e)),
    }
}

fn parse_point(cx: &mut FunctionContext, json: &str, what: &str) -> NeonResult<GeoPoint> {
    let raw: GeoPoint = parse_json(cx, json, what)?;
    match GeoPoint::new(raw.latitude, raw.longitude) {
        Ok(point) => Ok(point),
        Err(e) => cx.throw_error(format!("Invalid {}: {}", what, e)),
    }
}

fn parse_points(cx: &mut FunctionContext, json: &str, what: &str) -> NeonResult<Vec<GeoPoint>> {
    let raw: Vec<GeoPoint> = parse_json(cx, json, what)?;
    let mut points = Vec::with_capacity(raw.len());
    for point in raw {
        match GeoPoint::new(point.latitude, point.longitude) {
            Ok(point) => points.push(point),
            Err(e) => return cx.throw_error(format!("Invalid {}: {}", what, e)),
        }
    }
    Ok(points)
}

fn to_js_json<'a, T: Serialize>(cx: &mut FunctionContext<'a>, value: &T) -> JsResult<'a, JsString> {
    match serde_json::to_string(value) {
        Ok(json) => Ok(cx.string(json)),
        Err(e) => cx.throw_error(format!("Failed to serialize result: {}", e)),
    }
}

fn optional_number(cx: &mut FunctionContext, index: usize) -> Option<f64> {
    let value = cx.argument_opt(index)?;
    let number = value.downcast::<JsNumber, _>(cx).ok()?;
    Some(number.value(cx))
}

fn optional_string(cx: &mut FunctionContext, index: usize) -> Option<String> {
    let value = cx.argument_opt(index)?;
    let string = value.downcast::<JsString, _>(cx).ok()?;
    Some(string.value(cx))
}

fn distance(mut cx: FunctionContext) -> JsResult<JsNumber> {
    let lat1 = cx.argument::<JsNumber>(0)?.value(&mut cx);
    let lon1 = cx.argument::<JsNumber>(1)?.value(&mut cx);
    let lat2 = cx.argument::<JsNumber>(2)?.value(&mut cx);
    let lon2 = cx.argument::<JsNumber>(3)?.value(&mut cx);

    let a = GeoPoint::new(lat1, lon1).or_else(|e| cx.throw_error(e.to_string()))?;
    let b = GeoPoint::new(lat2, lon2).or_else(|e| cx.throw_error(e.to_string()))?;

    Ok(cx.number(distance_meters(&a, &b)))
}

fn normalize_reports(mut cx: FunctionContext) -> JsResult<JsString> {
    let reports_json = cx.argument::<JsString>(0)?.value(&mut cx);
    let batch = parse_reports_json(&reports_json).or_else(|e| cx.throw_error(e.to_string()))?;
    to_js_json(&mut cx, &batch)
}

fn nearest_reports(mut cx: FunctionContext) -> JsResult<JsString> {
    let origin_json = cx.argument::<JsString>(0)?.value(&mut cx);
    let reports_json = cx.argument::<JsString>(1)?.value(&mut cx);
    let k = cx.argument::<JsNumber>(2)?.value(&mut cx).max(0.0) as usize;

    let origin: Option<GeoPoint> = parse_json(&mut cx, &origin_json, "origin")?;
    let origin = match origin {
        Some(point) => GeoPoint::new(point.latitude, point.longitude)
            .or_else(|e| cx.throw_error(e.to_string()))?,
        None => DEFAULT_FALLBACK_ORIGIN,
    };
    let batch = parse_reports_json(&reports_json).or_else(|e| cx.throw_error(e.to_string()))?;

    let nearest = nearest_k(&origin, &batch.reports, k);
    to_js_json(&mut cx, &nearest)
}

fn reports_near_path(mut cx: FunctionContext) -> JsResult<JsString> {
    let waypoints_json = cx.argument::<JsString>(0)?.value(&mut cx);
    let reports_json = cx.argument::<JsString>(1)?.value(&mut cx);
    let buffer_meters = cx.argument::<JsNumber>(2)?.value(&mut cx);
    let excluded_json = optional_string(&mut cx, 3).unwrap_or_else(|| "[\"RESOLVED\"]".to_string());

    let waypoints = parse_points(&mut cx, &waypoints_json, "waypoints")?;
    let excluded: Vec<crate::core::types::Status> =
        parse_json(&mut cx, &excluded_json, "excluded statuses")?;
    let batch = parse_reports_json(&reports_json).or_else(|e| cx.throw_error(e.to_string()))?;

    let matched = reports_near_route(
        &waypoints,
        &batch.reports,
        buffer_meters,
        &status_set(&excluded),
    );
    to_js_json(&mut cx, &matched)
}

fn straight_line_route(mut cx: FunctionContext) -> JsResult<JsString> {
    let from_json = cx.argument::<JsString>(0)?.value(&mut cx);
    let to_json = cx.argument::<JsString>(1)?.value(&mut cx);
    let speed_kmh = optional_number(&mut cx, 2).unwrap_or(DEFAULT_FALLBACK_SPEED_KMH);

    let from = parse_point(&mut cx, &from_json, "from")?;
    let to = parse_point(&mut cx, &to_json, "to")?;

    to_js_json(&mut cx, &fallback_route(from, to, speed_kmh))
}

fn create_session(mut cx: FunctionContext) -> JsResult<JsNumber> {
    let options_json = optional_string(&mut cx, 0).unwrap_or_else(|| "{}".to_string());
    let options = ProximityOptions::from_json(&options_json)
        .or_else(|e| cx.throw_error(format!("Invalid options: {}", e)))?;

    let source = HttpReportSource::from_options(&options)
        .or_else(|e| cx.throw_error(format!("Failed to create report client: {}", e)))?;
    let session = Arc::new(AddonSession {
        directions: OsrmDirections::from_options(&options),
        view: ViewSession::new(options.clone(), source),
    });

    {
        let _guard = TOKIO_RUNTIME.enter();
        session.view.start_polling();
    }

    let session_id = NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst);
    SESSIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(session_id, session);

    Ok(cx.number(session_id as f64))
}

fn refresh_session(mut cx: FunctionContext) -> JsResult<JsPromise> {
    let session_id = cx.argument::<JsNumber>(0)?.value(&mut cx) as i32;
    let session = get_session(&mut cx, session_id)?;

    let (deferred, promise) = cx.promise();
    let channel = cx.channel();

    TOKIO_RUNTIME.spawn(async move {
        let outcome = session.view.refresh().await;
        let result = serde_json::to_string(&outcome);
        deferred.settle_with(&channel, move |mut cx| match result {
            Ok(json) => Ok(cx.string(json)),
            Err(e) => cx.throw_error(e.to_string()),
        });
    });

    Ok(promise)
}

fn get_reports(mut cx: FunctionContext) -> JsResult<JsString> {
    let session_id = cx.argument::<JsNumber>(0)?.value(&mut cx) as i32;
    let filter_json = optional_string(&mut cx, 1);
    let session = get_session(&mut cx, session_id)?;

    let filter: ReportFilter = match filter_json {
        Some(json) => parse_json(&mut cx, &json, "filter")?,
        None => ReportFilter::default(),
    };

    to_js_json(&mut cx, &session.view.filtered_reports(&filter))
}

/// Accepts `{latitude, longitude}` or `{errorCode}` as produced by the browser.
fn update_location(mut cx: FunctionContext) -> JsResult<JsString> {
    let session_id = cx.argument::<JsNumber>(0)?.value(&mut cx) as i32;
    let position_json = cx.argument::<JsString>(1)?.value(&mut cx);
    let session = get_session(&mut cx, session_id)?;

    let value: serde_json::Value = parse_json(&mut cx, &position_json, "position")?;
    let reported = match value.get("errorCode").and_then(|c| c.as_u64()) {
        Some(code) => Err(LocationFailure::from_code(code as u32)),
        None => serde_json::from_value::<GeoPoint>(value)
            .ok()
            .and_then(|p| GeoPoint::new(p.latitude, p.longitude).ok())
            .ok_or(LocationFailure::PositionUnavailable),
    };

    let resolved = TOKIO_RUNTIME.block_on(session.view.relocate(&ReportedPosition(reported)));
    to_js_json(&mut cx, &resolved)
}

fn nearby_reports(mut cx: FunctionContext) -> JsResult<JsString> {
    let session_id = cx.argument::<JsNumber>(0)?.value(&mut cx) as i32;
    let k = optional_number(&mut cx, 1).map(|k| k.max(0.0) as usize);
    let session = get_session(&mut cx, session_id)?;

    to_js_json(&mut cx, &session.view.nearby(k))
}

fn nearby_within(mut cx: FunctionContext) -> JsResult<JsString> {
    let session_id = cx.argument::<JsNumber>(0)?.value(&mut cx) as i32;
    let radius_meters = cx.argument::<JsNumber>(1)?.value(&mut cx);
    let session = get_session(&mut cx, session_id)?;

    to_js_json(&mut cx, &session.view.nearby_within(radius_meters))
}

fn session_reports_near_route(mut cx: FunctionContext) -> JsResult<JsString> {
    let session_id = cx.argument::<JsNumber>(0)?.value(&mut cx) as i32;
    let waypoints_json = cx.argument::<JsString>(1)?.value(&mut cx);
    let buffer_meters = optional_number(&mut cx, 2);
    let session = get_session(&mut cx, session_id)?;

    let waypoints = parse_points(&mut cx, &waypoints_json, "waypoints")?;
    to_js_json(
        &mut cx,
        &session.view.reports_near_route(&waypoints, buffer_meters),
    )
}

fn plan_route(mut cx: FunctionContext) -> JsResult<JsPromise> {
    let session_id = cx.argument::<JsNumber>(0)?.value(&mut cx) as i32;
    let from_json = cx.argument::<JsString>(1)?.value(&mut cx);
    let to_json = cx.argument::<JsString>(2)?.value(&mut cx);
    let session = get_session(&mut cx, session_id)?;

    let from = parse_point(&mut cx, &from_json, "from")?;
    let to = parse_point(&mut cx, &to_json, "to")?;

    let (deferred, promise) = cx.promise();
    let channel = cx.channel();

    TOKIO_RUNTIME.spawn(async move {
        let plan = session.view.plan_route(&session.directions, from, to).await;
        let result = serde_json::to_string(&plan);
        deferred.settle_with(&channel, move |mut cx| match result {
            Ok(json) => Ok(cx.string(json)),
            Err(e) => cx.throw_error(e.to_string()),
        });
    });

    Ok(promise)
}

fn export_route_scan(mut cx: FunctionContext) -> JsResult<JsString> {
    let session_id = cx.argument::<JsNumber>(0)?.value(&mut cx) as i32;
    let route_json = cx.argument::<JsString>(1)?.value(&mut cx);
    let buffer_meters = optional_number(&mut cx, 2);
    let output_path = optional_string(&mut cx, 3);
    let session = get_session(&mut cx, session_id)?;

    let route: Route = parse_json(&mut cx, &route_json, "route")?;
    route
        .validate()
        .or_else(|e| cx.throw_error(format!("Invalid route: {}", e)))?;
    let export = session.view.scan_route(route, buffer_meters);

    if let Some(path) = output_path {
        export
            .write_to(Path::new(&path))
            .or_else(|e| cx.throw_error(format!("Failed to write export: {}", e)))?;
    }

    let json = export
        .to_json()
        .or_else(|e| cx.throw_error(e.to_string()))?;
    Ok(cx.string(json))
}

fn close_session(mut cx: FunctionContext) -> JsResult<JsBoolean> {
    let session_id = cx.argument::<JsNumber>(0)?.value(&mut cx) as i32;
    let removed = SESSIONS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .remove(&session_id);

    match removed {
        Some(session) => {
            session.view.close();
            Ok(cx.boolean(true))
        }
        None => Ok(cx.boolean(false)),
    }
}

#[neon::main]
fn main(mut cx: ModuleContext) -> NeonResult<()> {
    cx.export_function("distance", distance)?;
    cx.export_function("normalizeReports", normalize_reports)?;
    cx.export_function("nearestReports", nearest_reports)?;
    cx.export_function("reportsNearRoute", reports_near_path)?;
    cx.export_function("fallbackRoute", straight_line_route)?;

    cx.export_function("createSession", create_session)?;
    cx.export_function("refreshSession", refresh_session)?;
    cx.export_function("getReports", get_reports)?;
    cx.export_function("updateLocation", update_location)?;
    cx.export_function("nearbyReports", nearby_reports)?;
    cx.export_function("nearbyWithin", nearby_within)?;
    cx.export_function("sessionReportsNearRoute", session_reports_near_route)?;
    cx.export_function("planRoute", plan_route)?;
    cx.export_function("exportRouteScan", export_route_scan)?;
    cx.export_function("closeSession", close_session)?;

    Ok(())
}
