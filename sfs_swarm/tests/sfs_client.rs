//! SmartFox client against an in-process fake server.

use futures_util::{SinkExt, StreamExt};
use sfs_swarm::{
    ClientEvent, ProtocolClient, Request, RoomInfo, RoomRef,
    facade::ClientEvents,
    net::{
        SfsArray, SfsClient, SfsObject, SfsValue, Transport,
        codec::{decode_packet, encode_packet},
    },
};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

type ServerSocket = WebSocketStream<TcpStream>;

fn message(controller: i8, action: i16, params: SfsObject) -> SfsObject {
    let mut msg = SfsObject::new();
    msg.put_byte("c", controller)
        .put_short("a", action)
        .put_object("p", params);
    msg
}

fn room(id: i32, name: &str, users: i16) -> SfsValue {
    SfsValue::Array(
        vec![
            SfsValue::Int(id),
            SfsValue::Utf(name.to_string()),
            SfsValue::Utf("default".to_string()),
            SfsValue::Bool(false),
            SfsValue::Bool(false),
            SfsValue::Bool(false),
            SfsValue::Short(users),
            SfsValue::Short(50),
        ]
        .into_iter()
        .collect::<SfsArray>(),
    )
}

async fn write(ws: &mut ServerSocket, msg: &SfsObject) {
    let bytes = encode_packet(msg).unwrap();
    ws.send(Message::Binary(bytes.into())).await.unwrap();
}

async fn read(ws: &mut ServerSocket) -> SfsObject {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Binary(data) => return decode_packet(&data).unwrap(),
            _ => continue,
        }
    }
}

async fn next_event(events: &mut ClientEvents) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event timed out")
        .expect("event stream closed")
}

/// Accept one client and complete the handshake
async fn accept_client(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = listener.accept().await.unwrap();
    let mut ws = accept_async(stream).await.unwrap();

    let hello = read(&mut ws).await;
    assert_eq!(hello.get_byte("c"), Some(0));
    assert_eq!(hello.get_short("a"), Some(0));
    let params = hello.get_object("p").unwrap();
    assert_eq!(params.get_bool("bin"), Some(true));
    assert!(params.get_utf("api").is_some());

    let mut reply = SfsObject::new();
    reply.put_utf("tk", "token").put_int("ct", 1024);
    write(&mut ws, &message(0, 0, reply)).await;
    ws
}

#[tokio::test]
async fn test_full_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let mut ws = accept_client(&listener).await;

        let login = read(&mut ws).await;
        assert_eq!(login.get_short("a"), Some(1));
        let p = login.get_object("p").unwrap();
        assert_eq!(p.get_utf("zn"), Some("World"));
        assert_eq!(p.get_utf("un"), Some("bot01"));
        assert_eq!(p.get_object("p").unwrap().get_utf("loginName"), Some("bot01"));

        let mut rooms = SfsObject::new();
        rooms
            .put_utf("zn", "World")
            .put_utf("un", "bot01")
            .put_array(
                "rl",
                vec![room(1, "lobby@1", 3), room(2, "lobby@2", 9)]
                    .into_iter()
                    .collect(),
            );
        write(&mut ws, &message(0, 1, rooms)).await;

        let join = read(&mut ws).await;
        assert_eq!(join.get_short("a"), Some(4));
        assert_eq!(join.get_object("p").unwrap().get_utf("n"), Some("lobby@2"));
        let mut joined = SfsObject::new();
        joined.put("r", room(2, "lobby@2", 10));
        write(&mut ws, &message(0, 4, joined)).await;

        let ext = read(&mut ws).await;
        assert_eq!(ext.get_byte("c"), Some(1));
        assert_eq!(ext.get_short("a"), Some(13));
        let p = ext.get_object("p").unwrap();
        assert_eq!(p.get_utf("c"), Some("roomjoincomplete"));
        assert_eq!(p.get_int("r"), Some(2));

        let mut payload = SfsObject::new();
        payload.put_utf("status", "ok");
        let mut response = SfsObject::new();
        response.put_utf("c", "init").put_object("p", payload);
        write(&mut ws, &message(1, 13, response)).await;

        let mut count = SfsObject::new();
        count.put_int("r", 1).put_short("uc", 20);
        write(&mut ws, &message(0, 1001, count)).await;

        ws.close(None).await.unwrap();
    });

    let (mut client, mut events) = SfsClient::new(Transport::direct());
    client.connect("127.0.0.1", port, false);
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Connection {
            success: true,
            reason: None
        }
    );

    let mut params = SfsObject::new();
    params.put_utf("username", "bot01").put_utf("loginName", "bot01");
    client
        .send(Request::Login {
            username: "bot01".to_string(),
            password: String::new(),
            params,
            zone: "World".to_string(),
        })
        .unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Login);
    assert_eq!(
        client.room_list(),
        Some(vec![RoomInfo::new("lobby@1", 3), RoomInfo::new("lobby@2", 9)])
    );

    client
        .send(Request::JoinRoom {
            name: "lobby@2".to_string(),
        })
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::RoomJoin {
            room: Some(RoomRef {
                id: 2,
                name: "lobby@2".to_string()
            })
        }
    );

    client
        .send(Request::extension("roomjoincomplete", SfsObject::new()))
        .unwrap();
    match next_event(&mut events).await {
        ClientEvent::ExtensionResponse { command, params } => {
            assert_eq!(command, "init");
            assert_eq!(params.get_utf("status"), Some("ok"));
        }
        other => panic!("expected extension response, got {other:?}"),
    }

    assert!(matches!(
        next_event(&mut events).await,
        ClientEvent::ConnectionLost { .. }
    ));
    assert_eq!(
        client.room_list(),
        Some(vec![RoomInfo::new("lobby@1", 20), RoomInfo::new("lobby@2", 10)])
    );
    server.await.unwrap();
}

#[tokio::test]
async fn test_login_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let mut ws = accept_client(&listener).await;
        read(&mut ws).await;

        let mut error = SfsObject::new();
        error
            .put_short("ec", 6)
            .put("ep", SfsValue::UtfArray(vec!["bot01".to_string()]));
        write(&mut ws, &message(0, 1, error)).await;
        ws
    });

    let (mut client, mut events) = SfsClient::new(Transport::direct());
    client.connect("127.0.0.1", port, false);
    next_event(&mut events).await;

    client
        .send(Request::Login {
            username: "bot01".to_string(),
            password: "pw".to_string(),
            params: SfsObject::new(),
            zone: "World".to_string(),
        })
        .unwrap();

    match next_event(&mut events).await {
        ClientEvent::LoginError { message } => {
            assert!(message.contains('6'));
            assert!(message.contains("bot01"));
        }
        other => panic!("expected login error, got {other:?}"),
    }
    drop(server.await.unwrap());
}

#[tokio::test]
async fn test_connection_refused_reports_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let (mut client, mut events) = SfsClient::new(Transport::direct());
    client.connect("127.0.0.1", port, false);

    match next_event(&mut events).await {
        ClientEvent::Connection { success, reason } => {
            assert!(!success);
            assert!(reason.is_some());
        }
        other => panic!("expected connection failure, got {other:?}"),
    }
}
