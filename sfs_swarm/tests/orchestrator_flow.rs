//! Orchestrator spawning tests driven under paused time.

use sfs_swarm::{
    BotConfig, ClientEvent, ClientFactory, FacadeError, Orchestrator, ProtocolClient, Request,
    RoomInfo, SwarmConfig, facade::ClientEvents, proxy::ProxySelector,
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};

/// One bot creation as seen by the factory
#[derive(Debug, Clone)]
struct Created {
    username: String,
    proxy: Option<String>,
    at: Instant,
}

#[derive(Clone, Default)]
struct RecordingFactory {
    created: Arc<Mutex<Vec<Created>>>,
    event_senders: Arc<Mutex<Vec<mpsc::UnboundedSender<ClientEvent>>>>,
    requests: Arc<Mutex<Vec<(String, Request)>>>,
    connects: Arc<Mutex<Vec<String>>>,
}

struct RecordingClient {
    username: String,
    requests: Arc<Mutex<Vec<(String, Request)>>>,
    connects: Arc<Mutex<Vec<String>>>,
}

impl ProtocolClient for RecordingClient {
    fn connect(&mut self, host: &str, port: u16, use_ssl: bool) {
        self.connects
            .lock()
            .unwrap()
            .push(format!("{}@{host}:{port}:{use_ssl}", self.username));
    }

    fn send(&mut self, request: Request) -> Result<(), FacadeError> {
        self.requests
            .lock()
            .unwrap()
            .push((self.username.clone(), request));
        Ok(())
    }

    fn room_list(&self) -> Option<Vec<RoomInfo>> {
        None
    }
}

impl ClientFactory for RecordingFactory {
    type Client = RecordingClient;

    fn create(&self, config: &BotConfig) -> (RecordingClient, ClientEvents) {
        self.created.lock().unwrap().push(Created {
            username: config.username.clone(),
            proxy: config.proxy.clone(),
            at: Instant::now(),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        self.event_senders.lock().unwrap().push(tx);
        let client = RecordingClient {
            username: config.username.clone(),
            requests: Arc::clone(&self.requests),
            connects: Arc::clone(&self.connects),
        };
        (client, rx)
    }
}

fn swarm(extra: &str) -> SwarmConfig {
    SwarmConfig::from_json(&format!(
        r#"{{"host": "game.local", "port": 8080, "zone": "World", "namePrefix": "bot"{extra}}}"#
    ))
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_three_bots_named_and_staggered() {
    let config = swarm(r#", "botCount": 3, "randomizeNames": false, "staggerMs": 100"#);
    let factory = RecordingFactory::default();
    let orchestrator = Orchestrator::new(config, None, factory.clone());

    let handles = orchestrator.spawn_all().await;

    let created = factory.created.lock().unwrap().clone();
    let names: Vec<&str> = created.iter().map(|c| c.username.as_str()).collect();
    assert_eq!(names, vec!["bot01", "bot02", "bot03"]);
    for pair in created.windows(2) {
        assert!(pair[1].at > pair[0].at);
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(100));
    }
    assert!(created.iter().all(|c| c.proxy.is_none()));
    assert_eq!(handles.len(), 3);
    assert_eq!(
        factory.connects.lock().unwrap().as_slice(),
        &[
            "bot01@game.local:8080:false",
            "bot02@game.local:8080:false",
            "bot03@game.local:8080:false"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_proxy_slots_follow_bot_index() {
    let config = swarm(r#", "botCount": 5"#);
    let selector = ProxySelector::new(vec!["http://a:1".to_string(), "http://b:1".to_string()], 2)
        .unwrap()
        .map(Arc::new);
    let factory = RecordingFactory::default();

    Orchestrator::new(config, selector, factory.clone())
        .spawn_all()
        .await;

    let proxies: Vec<Option<String>> = factory
        .created
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.proxy.clone())
        .collect();
    let expected = ["http://a:1", "http://a:1", "http://b:1", "http://b:1", "http://a:1"];
    assert_eq!(
        proxies,
        expected
            .iter()
            .map(|p| Some(p.to_string()))
            .collect::<Vec<_>>()
    );
}

#[tokio::test(start_paused = true)]
async fn test_spawned_bots_react_to_events() {
    let config = swarm(r#", "botCount": 2, "zoneOnly": true"#);
    let factory = RecordingFactory::default();
    let handles = Orchestrator::new(config, None, factory.clone())
        .spawn_all()
        .await;

    let senders = factory.event_senders.lock().unwrap().clone();
    senders[1]
        .send(ClientEvent::Connection {
            success: true,
            reason: None,
        })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;

    {
        let requests = factory.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "bot02");
        assert!(matches!(requests[0].1, Request::Login { .. }));
    }

    senders[1]
        .send(ClientEvent::ConnectionLost {
            reason: "closed".to_string(),
        })
        .unwrap();
    let mut handles = handles;
    let finished = handles.remove(1);
    tokio::time::timeout(Duration::from_secs(1), finished)
        .await
        .unwrap()
        .unwrap();
}
