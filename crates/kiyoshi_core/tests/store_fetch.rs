use kiyoshi_core::{
    kiyoshi_samples, normalize_kiyoshies, Action, FetchKiyoshiesSaga, KiyoshiSource, RootState,
    Saga, SourceError, StaticSource, Store, StoreConfig, StoreError,
};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn samples_source() -> StaticSource {
    StaticSource::new(serde_json::to_value(kiyoshi_samples()).unwrap())
}

struct OfflineSource;

impl KiyoshiSource for OfflineSource {
    fn fetch_raw(&self) -> Result<Value, SourceError> {
        Err(SourceError::Unavailable("network is down".to_string()))
    }
}

/// Emits `FetchKiyoshiesRequested` for every action it sees.
struct EchoSaga;

impl Saga for EchoSaga {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn on_action(&mut self, _action: &Action, _state: &RootState) -> Vec<Action> {
        vec![Action::FetchKiyoshiesRequested]
    }
}

#[test]
fn fetch_request_loads_normalized_samples() {
    let mut store = Store::new(StoreConfig::default());
    store
        .run_saga(Box::new(FetchKiyoshiesSaga::new(samples_source())))
        .unwrap();

    store.dispatch(Action::FetchKiyoshiesRequested).unwrap();

    let state = &store.state().kiyoshi;
    assert!(!state.fetching);
    assert_eq!(state.error, None);
    assert_eq!(state.data, normalize_kiyoshies(kiyoshi_samples()));
    assert_eq!(state.kiyoshies().unwrap(), kiyoshi_samples().to_vec());
}

#[test]
fn listeners_see_fetching_then_result() {
    let mut store = Store::new(StoreConfig::default());
    store
        .run_saga(Box::new(FetchKiyoshiesSaga::new(samples_source())))
        .unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store
        .subscribe(move |state: &RootState| {
            sink.borrow_mut()
                .push((state.kiyoshi.fetching, state.kiyoshi.data.len()));
        })
        .unwrap();

    store.dispatch(Action::FetchKiyoshiesRequested).unwrap();
    assert_eq!(*seen.borrow(), vec![(true, 0), (false, 4)]);
}

#[test]
fn source_failure_is_reported_in_state() {
    let mut store = Store::new(StoreConfig::default());
    store
        .run_saga(Box::new(FetchKiyoshiesSaga::new(OfflineSource)))
        .unwrap();

    store.dispatch(Action::FetchKiyoshiesRequested).unwrap();

    let state = &store.state().kiyoshi;
    assert!(!state.fetching);
    assert!(state.data.is_empty());
    assert_eq!(
        state.error.as_deref(),
        Some("source unavailable: network is down")
    );
}

#[test]
fn invalid_payload_is_reported_with_field_path() {
    let mut payload = serde_json::to_value(kiyoshi_samples()).unwrap();
    payload[1]["id"] = json!("nope");

    let mut store = Store::new(StoreConfig::default());
    store
        .run_saga(Box::new(FetchKiyoshiesSaga::new(StaticSource::new(payload))))
        .unwrap();
    store.dispatch(Action::FetchKiyoshiesRequested).unwrap();

    let error = store.state().kiyoshi.error.clone().unwrap();
    assert!(error.contains("[1].id"), "unexpected error: {error}");
}

#[test]
fn reference_only_payload_fails_fetch() {
    let sample = &kiyoshi_samples()[0];
    let payload = json!([{
        "id": sample.id.to_string(),
        "saidAt": sample.said_at.as_str(),
        "madeBy": sample.made_by.id.to_string(),
    }]);

    let saga = FetchKiyoshiesSaga::new(StaticSource::new(payload));
    let err = saga.fetch().unwrap_err();
    assert!(err.to_string().contains("without embedding it"));
}

#[test]
fn runaway_sagas_hit_follow_up_limit() {
    let mut store = Store::new(StoreConfig {
        max_follow_up_actions: 3,
    });
    store.run_saga(Box::new(EchoSaga)).unwrap();

    let err = store.dispatch(Action::KiyoshiesCleared).unwrap_err();
    assert_eq!(err, StoreError::FollowUpLimitExceeded { limit: 3 });
}

#[test]
fn shutdown_rejects_further_use_and_keeps_state() {
    let mut store = Store::new(StoreConfig::default());
    store
        .run_saga(Box::new(FetchKiyoshiesSaga::new(samples_source())))
        .unwrap();
    store.dispatch(Action::FetchKiyoshiesRequested).unwrap();

    store.shutdown();
    store.shutdown();

    assert!(!store.is_running());
    assert_eq!(
        store.dispatch(Action::KiyoshiesCleared),
        Err(StoreError::ShutDown)
    );
    assert_eq!(
        store.subscribe(|_: &RootState| {}).unwrap_err(),
        StoreError::ShutDown
    );
    assert_eq!(store.state().kiyoshi.data.len(), 4);
}

#[test]
fn unsubscribe_stops_notifications() {
    let mut store = Store::new(StoreConfig::default());
    let calls = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&calls);
    let id = store
        .subscribe(move |_: &RootState| *sink.borrow_mut() += 1)
        .unwrap();

    store.dispatch(Action::KiyoshiesCleared).unwrap();
    assert!(store.unsubscribe(id));
    assert!(!store.unsubscribe(id));
    store.dispatch(Action::KiyoshiesCleared).unwrap();

    assert_eq!(*calls.borrow(), 1);
}
