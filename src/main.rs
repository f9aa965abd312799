use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::json;

use erpc::config::{load_config, ServerConfig};
use erpc::observability::{logging, metrics};
use erpc::{typed, EventContext, Procedure, Server};

#[derive(Serialize, Deserialize)]
struct Register {
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize)]
struct UpdateMessage {
    new_content: String,
}

#[derive(Serialize, Deserialize)]
struct CreateMessage {
    msg_content: String,
}

#[derive(Serialize, Deserialize)]
struct SendMessage {
    contents: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => load_config(&path)?,
        None => ServerConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("erpc v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let start_auto = config.listener.start_auto;
    let mut server = Server::new(config);

    let base = Procedure::base();
    let authed = base.extend(|_req, _locals| async { Ok(json!({ "token": "Example user token" })) });

    server
        .router()
        .post("/register", &base.input(typed::<Register>()), |_req, locals| async move {
            let input: Register = locals.input()?;
            Ok(input)
        });

    let user = server.sub("/user/:user_uuid");
    user.put(
        "/msg/:msg_uuid",
        &authed.input(typed::<UpdateMessage>()),
        |req, locals| async move {
            let input: UpdateMessage = locals.input()?;
            Ok(json!({
                "updatedBy": req.param("user_uuid"),
                "uuid": req.param("msg_uuid"),
                "content": input.new_content,
            }))
        },
    );
    user.get("/testing", &base, |_req, _locals| async {
        Ok(json!({ "data": "this is in the testing route" }))
    });
    user.sub("/message").post(
        "/create",
        &base.input(typed::<CreateMessage>()),
        |_req, _locals| async { Ok(json!({ "good": true })) },
    );

    server.ws().on(
        "/gateway",
        "send_message",
        &base.input(typed::<SendMessage>()),
        |ctx: EventContext| async move {
            let input: SendMessage = ctx.locals.input()?;
            tracing::info!(connection_id = %ctx.connection.id(), contents = %input.contents, "Message received");
            ctx.connection.emit("message_received", json!({ "contents": input.contents })).await
        },
    );

    if !start_auto {
        let app = server.into_app()?;
        tracing::info!(
            socket_routes = app.ws_routes().route_count(),
            "Routes compiled, not listening (listener.start_auto = false)"
        );
        return Ok(());
    }

    server.listen().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
