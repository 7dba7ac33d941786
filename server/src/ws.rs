//! WebSocket connection handling: upgrade, dispatch, and teardown.
//!
//! Each accepted connection gets a dual-task send/receive pair, the same
//! shape the old relay used for its binary protocol: a receive task reads
//! frames off the socket and drives dispatch, a send task drains the
//! socket's `ServerEvent` queue back out over the wire, and whichever task
//! finishes first aborts the other. The difference is what rides inside the
//! frames — JSON `ClientEvent`/`ServerEvent` envelopes that get decoded and
//! actually interpreted here, not opaque bytes relayed verbatim to a
//! client-hosted game.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use lobby_core::broadcast::Broadcaster;
use lobby_core::engine::{GameEngine, GameKind};
use lobby_core::error::RouterError;
use lobby_core::rng::StdEngineRng;
use lobby_core::room::Room;
use lobby_core::router::ActionRouter;
use lobby_core::socket::SocketId;
use protocol::{ChatEntry, ClientEvent, RoomStatus, ServerEvent};
use std::sync::Arc;

use crate::state::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_connection(socket, state))
}

async fn handle_connection(stream: WebSocket, state: Arc<AppState>) {
    let socket_id = state.next_socket_id();
    let rx = state.sockets.register(socket_id);
    let (sender, receiver) = stream.split();

    let send_state = state.clone();
    let mut send_task = tokio::spawn(async move { send_loop(sender, rx, send_state, socket_id).await });

    let receive_state = state.clone();
    let mut receive_task =
        tokio::spawn(async move { receive_loop(receiver, receive_state, socket_id).await });

    // Whichever task finishes first (socket closed, protocol error) aborts
    // the other so we never leak a half-open pair.
    tokio::select! {
        res = &mut send_task => { receive_task.abort(); log_task_exit("send", res); }
        res = &mut receive_task => { send_task.abort(); log_task_exit("receive", res); }
    }

    cleanup_connection(&state, socket_id).await;
}

fn log_task_exit(which: &'static str, result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        tracing::error!(task = which, ?err, "connection task panicked");
    }
}

async fn send_loop(
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<ServerEvent>,
    _state: Arc<AppState>,
    socket_id: SocketId,
) {
    while let Some(event) = rx.recv().await {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(?err, socket_id, "failed to encode outgoing event");
                continue;
            }
        };
        if sender.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }
}

async fn receive_loop(
    mut receiver: futures_util::stream::SplitStream<WebSocket>,
    state: Arc<AppState>,
    socket_id: SocketId,
) {
    while let Some(frame) = receiver.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(_) => return,
        };
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => return,
            _ => continue,
        };
        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(?err, socket_id, "malformed client event");
                emit_error(&state, socket_id, "malformed envelope", Some(RouterError::MalformedEnvelope.code()));
                continue;
            }
        };
        dispatch(&state, socket_id, event).await;
    }
}

async fn cleanup_connection(state: &Arc<AppState>, socket_id: SocketId) {
    if let (Some(room_code), Some(player_id)) = (state.sockets.room_of(socket_id), state.sockets.player_of(socket_id)) {
        let _guard = state.locks.lock(&room_code).await;
        if let Some(mut room) = state.repo.find(&room_code) {
            room.mark_disconnected(&player_id);
            room.last_activity_ms = state.now_ms();
            state.repo.save(room.clone());
            Broadcaster::new(&state.sockets).broadcast_room_update(&room);
        }
    }
    state.sockets.unregister(socket_id);
}

fn emit_error(state: &AppState, socket_id: SocketId, message: impl Into<String>, code: Option<&'static str>) {
    Broadcaster::new(&state.sockets).broadcast_error_to_socket(socket_id, message, code);
}

async fn dispatch(state: &Arc<AppState>, socket_id: SocketId, event: ClientEvent) {
    match event {
        ClientEvent::RoomJoin { room_code, player_id, display_name } => {
            handle_room_join(state, socket_id, room_code.to_ascii_uppercase(), player_id, display_name).await
        }
        ClientEvent::RoomLeave => handle_room_leave(state, socket_id).await,
        ClientEvent::RoomTheme { theme_id } => handle_room_theme(state, socket_id, theme_id).await,
        ClientEvent::GameStart { room_code, options } => {
            handle_game_start(state, socket_id, room_code.to_ascii_uppercase(), options).await
        }
        ClientEvent::GameAction { room_code, action, data } => {
            handle_game_action(state, socket_id, room_code.to_ascii_uppercase(), action, data).await
        }
        ClientEvent::ChatJoin => handle_chat_join(state, socket_id).await,
        ClientEvent::ChatSend { room_code, message } => {
            handle_chat_send(state, socket_id, room_code.to_ascii_uppercase(), message).await
        }
    }
}

async fn handle_room_join(
    state: &Arc<AppState>,
    socket_id: SocketId,
    room_code: String,
    player_id: String,
    display_name: String,
) {
    let _guard = state.locks.lock(&room_code).await;
    let now = state.now_ms();
    let mut room = state.repo.find(&room_code).unwrap_or_else(|| Room::new(room_code.clone(), now));

    if room.find_seat(&player_id).is_some() {
        room.mark_reconnected(&player_id);
    } else {
        room.join(player_id.clone(), display_name);
    }
    room.last_activity_ms = now;
    state.repo.save(room.clone());
    state.sockets.join_room(socket_id, &room_code, &player_id);

    let broadcaster = Broadcaster::new(&state.sockets);
    broadcaster.broadcast_room_update(&room);

    if room.status == RoomStatus::Playing {
        state.store.with_engine(&room_code, |engine| {
            broadcaster.send_reconnection_state(&room, engine, &player_id);
        });
    }

    state.sockets.emit_to_socket(
        socket_id,
        ServerEvent::ChatHistory { entries: state.chat_history(&room_code) },
    );
}

async fn handle_room_leave(state: &Arc<AppState>, socket_id: SocketId) {
    let Some(room_code) = state.sockets.room_of(socket_id) else { return };
    let Some(player_id) = state.sockets.player_of(socket_id) else { return };

    let _guard = state.locks.lock(&room_code).await;
    if let Some(mut room) = state.repo.find(&room_code) {
        room.mark_disconnected(&player_id);
        room.last_activity_ms = state.now_ms();
        state.repo.save(room.clone());
        Broadcaster::new(&state.sockets).broadcast_room_update(&room);
    }
    state.sockets.leave_room(socket_id);
}

async fn handle_room_theme(state: &Arc<AppState>, socket_id: SocketId, theme_id: String) {
    let Some(room_code) = state.sockets.room_of(socket_id) else {
        emit_error(state, socket_id, "not in a room", Some(RouterError::NotInRoom.code()));
        return;
    };
    let Some(player_id) = state.sockets.player_of(socket_id) else { return };

    let _guard = state.locks.lock(&room_code).await;
    let Some(mut room) = state.repo.find(&room_code) else {
        emit_error(state, socket_id, "room not found", Some(RouterError::RoomNotFound.code()));
        return;
    };
    if !room.is_host(&player_id) {
        emit_error(state, socket_id, "not host", Some(RouterError::NotHost.code()));
        return;
    }
    room.theme_id = Some(theme_id);
    room.last_activity_ms = state.now_ms();
    state.repo.save(room.clone());
    Broadcaster::new(&state.sockets).broadcast_room_update(&room);
}

async fn handle_game_start(
    state: &Arc<AppState>,
    socket_id: SocketId,
    room_code: String,
    options: serde_json::Value,
) {
    let Some(player_id) = state.sockets.player_of(socket_id) else {
        emit_error(state, socket_id, "not authenticated", Some(RouterError::NotAuthenticated.code()));
        return;
    };

    let _guard = state.locks.lock(&room_code).await;
    let Some(room) = state.repo.find(&room_code) else {
        emit_error(state, socket_id, "room not found", Some(RouterError::RoomNotFound.code()));
        return;
    };
    if !room.is_host(&player_id) {
        emit_error(state, socket_id, "not host", Some(RouterError::NotHost.code()));
        return;
    }
    let Some(kind) = options.get("game").and_then(|v| v.as_str()).and_then(GameKind::from_str) else {
        emit_error(state, socket_id, "missing or unknown game kind", Some(RouterError::MalformedEnvelope.code()));
        return;
    };
    if kind == GameKind::Poker && !state.config.enable_poker {
        emit_error(state, socket_id, "poker is disabled on this server", Some("game_disabled"));
        return;
    }

    let player_count = room.seats.len() as u8;
    let mut rng = StdEngineRng::from_entropy();
    let mut engine = engines::create_engine(kind, player_count, &mut rng);
    for seat in &room.seats {
        engine.add_player(seat.seat_index, seat.player_id.clone());
    }
    let now = state.now_ms();
    if let Err(err) = state.lifecycle.start_game(&state.timers, &room_code, kind, engine, now) {
        emit_error(state, socket_id, err.to_string(), Some(err.code()));
    }
}

async fn handle_game_action(
    state: &Arc<AppState>,
    socket_id: SocketId,
    room_code: String,
    action: String,
    data: serde_json::Value,
) {
    let Some(player_id) = state.sockets.player_of(socket_id) else {
        emit_error(state, socket_id, "not authenticated", Some(RouterError::NotAuthenticated.code()));
        return;
    };

    let _guard = state.locks.lock(&room_code).await;
    let Some(room) = state.repo.find(&room_code) else {
        emit_error(state, socket_id, "room not found", Some(RouterError::RoomNotFound.code()));
        return;
    };

    let mut rng = StdEngineRng::from_entropy();
    let router = ActionRouter::new(&state.store);
    match router.dispatch(&room, &player_id, &action, &data, &mut rng) {
        Ok(outcome) => {
            if let Some(seat) = room.find_seat(&player_id) {
                state.lifecycle.clear_auto_play_count(&room_code, seat.seat_index);
            }
            let now = state.now_ms();
            state.lifecycle.after_action(&state.timers, &room_code, Some(outcome.description.clone()), now);
            if let Some(hint) = outcome.token_move {
                Broadcaster::new(&state.sockets).broadcast_token_move(&room, hint.steps, hint.final_state);
            }
        }
        Err(err) => emit_error(state, socket_id, err.to_string(), Some(err.code())),
    }
}

async fn handle_chat_join(state: &Arc<AppState>, socket_id: SocketId) {
    let Some(room_code) = state.sockets.room_of(socket_id) else { return };
    state.sockets.emit_to_socket(
        socket_id,
        ServerEvent::ChatHistory { entries: state.chat_history(&room_code) },
    );
}

async fn handle_chat_send(state: &Arc<AppState>, socket_id: SocketId, room_code: String, message: String) {
    let Some(player_id) = state.sockets.player_of(socket_id) else { return };
    let Some(room) = state.repo.find(&room_code) else { return };
    let Some(seat) = room.find_seat(&player_id) else { return };

    let entry = ChatEntry {
        player_id: player_id.clone(),
        display_name: seat.display_name.clone(),
        message,
        sent_at_ms: state.now_ms(),
    };
    let entry = state.push_chat(&room_code, entry);
    state.sockets.emit_to_room(&room_code, ServerEvent::ChatMessage(entry));
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobby_core::config::ServerConfig;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn join(
        state: &Arc<AppState>,
        room_code: &str,
        player_id: &str,
        name: &str,
    ) -> (SocketId, UnboundedReceiver<ServerEvent>) {
        let socket_id = state.next_socket_id();
        let mut rx = state.sockets.register(socket_id);
        handle_room_join(state, socket_id, room_code.to_string(), player_id.to_string(), name.to_string()).await;
        // Drain the RoomUpdate + ChatHistory this join produced so later
        // assertions in a test see only what happens next.
        let _ = rx.recv().await;
        let _ = rx.recv().await;
        (socket_id, rx)
    }

    #[tokio::test]
    async fn joining_seats_the_player_and_broadcasts_room_update() {
        let state = AppState::new(ServerConfig::default());
        let socket_id = state.next_socket_id();
        let mut rx = state.sockets.register(socket_id);

        handle_room_join(&state, socket_id, "ABCDEF".into(), "p1".into(), "Alice".into()).await;

        let ServerEvent::RoomUpdate { seats, status } = rx.recv().await.unwrap() else {
            panic!("expected RoomUpdate");
        };
        assert_eq!(seats.len(), 1);
        assert_eq!(status, RoomStatus::Waiting);
        assert!(matches!(rx.recv().await.unwrap(), ServerEvent::ChatHistory { .. }));
    }

    #[tokio::test]
    async fn non_host_cannot_start_the_game() {
        let state = AppState::new(ServerConfig::default());
        let (_host_socket, _host_rx) = join(&state, "ABCDEF", "p1", "Alice").await;
        let (guest_socket, mut guest_rx) = join(&state, "ABCDEF", "p2", "Bob").await;

        handle_game_start(&state, guest_socket, "ABCDEF".into(), json!({"game": "tic_tac_toe"})).await;

        let ServerEvent::Error { code, .. } = guest_rx.recv().await.unwrap() else {
            panic!("expected Error");
        };
        assert_eq!(code.as_deref(), Some("not_host"));
    }

    #[tokio::test]
    async fn host_starting_a_game_broadcasts_start_and_masked_state() {
        let state = AppState::new(ServerConfig::default());
        let (host_socket, mut host_rx) = join(&state, "ABCDEF", "p1", "Alice").await;
        let (_guest_socket, _guest_rx) = join(&state, "ABCDEF", "p2", "Bob").await;

        handle_game_start(&state, host_socket, "ABCDEF".into(), json!({"game": "tic_tac_toe"})).await;

        assert!(matches!(host_rx.recv().await.unwrap(), ServerEvent::GameStart { .. }));
        assert!(matches!(host_rx.recv().await.unwrap(), ServerEvent::GameState { .. }));
    }

    #[tokio::test]
    async fn action_from_the_seated_host_advances_the_board() {
        let state = AppState::new(ServerConfig::default());
        let (host_socket, mut host_rx) = join(&state, "ABCDEF", "p1", "Alice").await;
        let (_guest_socket, _guest_rx) = join(&state, "ABCDEF", "p2", "Bob").await;

        handle_game_start(&state, host_socket, "ABCDEF".into(), json!({"game": "tic_tac_toe"})).await;
        let _ = host_rx.recv().await; // GameStart
        let _ = host_rx.recv().await; // GameState

        handle_game_action(&state, host_socket, "ABCDEF".into(), "place".into(), json!({"row": 0, "column": 0})).await;

        let ServerEvent::GameState { last_action, .. } = host_rx.recv().await.unwrap() else {
            panic!("expected GameState after action");
        };
        assert_eq!(last_action.as_deref(), Some("p1 placed at (0, 0)"));
    }
}
