use axum::{
    extract::{
        Extension, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::broadcaster::{FeedExit, SnapshotFeed};
use super::registry::{CLOSE_SESSION_SUPERSEDED, Connection, ConnectionId, Membership};
use crate::{AppState, config::BroadcastMode, middleware::CurrentSession};

/// 连接结束的原因
enum Exit {
    Feed(FeedExit),
    /// 会话已被顶替
    Superseded,
    /// 客户端断开或写入失败
    ClientGone,
}

/// GET /ws/gps/
#[axum::debug_handler]
pub async fn gps_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Response {
    let session_key = current.session.session_key;
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_key))
}

async fn handle_socket(socket: WebSocket, state: AppState, session_key: String) {
    let room = state.config.broadcast_room.clone();
    let mode = state.config.broadcast_mode;

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(state.config.ws_queue_size);
    let connection = Connection::new(Some(session_key), tx.clone());
    let conn_id = connection.id;
    let shutdown = connection.shutdown.clone();
    info!(%conn_id, room = %room, "WebSocket connected");

    let feed = SnapshotFeed::from_config(state.snapshots.clone(), &state.config);

    // 共享模式下先推送首次快照再加入房间，首条消息不会是房间广播
    if mode == BroadcastMode::Shared {
        if let Err(exit) = feed.send_initial(&tx).await {
            close(&mut sink, &mut rx, conn_id, Exit::Feed(exit)).await;
            info!(%conn_id, room = %room, "WebSocket disconnected");
            return;
        }
    }

    // 离开作用域时自动退出房间
    let _membership = Membership::enter(state.rooms.clone(), connection, &room);

    let pump = async {
        match mode {
            BroadcastMode::PerConnection => feed.run(&tx).await,
            BroadcastMode::Shared => std::future::pending::<FeedExit>().await,
        }
    };

    let writer = async {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    };

    // 只读通道，客户端消息直接丢弃
    let reader = async {
        while let Some(Ok(message)) = stream.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    };

    let exit = tokio::select! {
        exit = pump => Exit::Feed(exit),
        _ = shutdown.notified() => Exit::Superseded,
        _ = writer => Exit::ClientGone,
        _ = reader => Exit::ClientGone,
    };

    close(&mut sink, &mut rx, conn_id, exit).await;
    info!(%conn_id, room = %room, "WebSocket disconnected");
}

async fn close(
    sink: &mut SplitSink<WebSocket, Message>,
    rx: &mut mpsc::Receiver<Message>,
    conn_id: ConnectionId,
    exit: Exit,
) {
    match exit {
        Exit::Feed(FeedExit::StoreFailed(e)) => {
            warn!(%conn_id, error = %e, "Snapshot store unavailable, closing connection");
            // 先把已入队的消息发完
            while let Ok(message) = rx.try_recv() {
                if sink.send(message).await.is_err() {
                    return;
                }
            }
            let _ = sink.send(Message::Close(None)).await;
        }
        Exit::Superseded => {
            info!(%conn_id, "Session superseded, closing connection");
            let frame = CloseFrame {
                code: CLOSE_SESSION_SUPERSEDED,
                reason: "session superseded".into(),
            };
            let _ = sink.send(Message::Close(Some(frame))).await;
        }
        Exit::Feed(FeedExit::Disconnected) | Exit::ClientGone => {}
    }
}
