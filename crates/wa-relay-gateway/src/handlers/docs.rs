//! Service index and API description.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use wa_relay_store::HistoryStore;

use crate::state::GatewayState;

const SERVICE_NAME: &str = "WhatsApp Relay API";

/// Links to every public endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    /// `POST /api/messages/send`
    pub send_message: String,
    /// `GET /api/messages/status`
    pub check_status: String,
    /// `GET /api/messages/qr`
    pub get_qr_code: String,
    /// `POST /api/messages/restart`
    pub restart_client: String,
    /// `POST /api/messages/restart-server`
    pub restart_server: String,
    /// `GET /api/history`
    pub get_history: String,
    /// `DELETE /api/history/clear`
    pub clear_history: String,
}

/// Response for `GET /`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
    /// Service name.
    pub name: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Link to the API description.
    pub documentation: String,
    /// Link to the pairing page.
    pub qr_code: String,
    /// Links to every endpoint.
    pub endpoints: Endpoints,
}

impl IndexResponse {
    fn new(base: &str) -> Self {
        Self {
            name: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            documentation: format!("{base}/api-docs"),
            qr_code: format!("{base}/api/messages/qr"),
            endpoints: Endpoints {
                send_message: format!("{base}/api/messages/send"),
                check_status: format!("{base}/api/messages/status"),
                get_qr_code: format!("{base}/api/messages/qr"),
                restart_client: format!("{base}/api/messages/restart"),
                restart_server: format!("{base}/api/messages/restart-server"),
                get_history: format!("{base}/api/history"),
                clear_history: format!("{base}/api/history/clear"),
            },
        }
    }
}

/// Service index with links to every endpoint.
pub async fn index<S>(State(state): State<Arc<GatewayState<S>>>) -> impl IntoResponse
where
    S: HistoryStore + 'static,
{
    Json(IndexResponse::new(&state.config.base_url()))
}

/// OpenAPI 3 description of the HTTP API.
pub async fn api_docs<S>(State(state): State<Arc<GatewayState<S>>>) -> impl IntoResponse
where
    S: HistoryStore + 'static,
{
    Json(openapi_document(&state.config.base_url()))
}

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": json_content("ErrorResponse")
    })
}

fn query_param(name: &str, schema: Value) -> Value {
    json!({ "in": "query", "name": name, "schema": schema })
}

fn json_content(schema: &str) -> Value {
    let reference = format!("#/components/schemas/{schema}");
    json!({ "application/json": { "schema": { "$ref": reference } } })
}

/// Build the OpenAPI document for a server reachable at `base`.
#[must_use]
pub fn openapi_document(base: &str) -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {
            "title": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "description": "REST API for sending WhatsApp messages and querying the send history"
        },
        "servers": [{ "url": base, "description": "Main server" }],
        "tags": [
            { "name": "Messages", "description": "Send messages and inspect the connection" },
            { "name": "History", "description": "Query and prune the send history" }
        ],
        "components": { "schemas": schemas() },
        "paths": paths()
    })
}

#[allow(clippy::too_many_lines)]
fn schemas() -> Value {
    json!({
        "SendMessageRequest": {
            "type": "object",
            "required": ["phone", "message"],
            "properties": {
                "phone": {
                    "type": "string",
                    "description": "Phone number with country code; non-digits are ignored",
                    "example": "5491123456789"
                },
                "message": { "type": "string", "example": "Hello from the relay!" }
            }
        },
        "SendMessageResponse": {
            "type": "object",
            "properties": {
                "success": { "type": "boolean", "example": true },
                "message": { "type": "string", "example": "Message sent successfully" },
                "to": { "type": "string", "example": "5491123456789" }
            }
        },
        "StatusResponse": {
            "type": "object",
            "properties": {
                "success": { "type": "boolean", "example": true },
                "ready": { "type": "boolean", "example": true },
                "message": { "type": "string" },
                "qrAvailable": { "type": "boolean", "example": false }
            }
        },
        "MessageRecord": {
            "type": "object",
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "to": { "type": "string" },
                "message": { "type": "string" },
                "status": { "type": "string", "enum": ["sent", "failed"] },
                "timestamp": { "type": "string", "format": "date-time" },
                "error": { "type": "string", "nullable": true }
            }
        },
        "HistoryResponse": {
            "type": "object",
            "properties": {
                "success": { "type": "boolean", "example": true },
                "stats": {
                    "type": "object",
                    "properties": {
                        "total": { "type": "integer" },
                        "sent": { "type": "integer" },
                        "failed": { "type": "integer" }
                    }
                },
                "messages": {
                    "type": "array",
                    "items": { "$ref": "#/components/schemas/MessageRecord" }
                }
            }
        },
        "ActionResponse": {
            "type": "object",
            "properties": {
                "success": { "type": "boolean", "example": true },
                "message": { "type": "string" }
            }
        },
        "ErrorResponse": {
            "type": "object",
            "properties": {
                "success": { "type": "boolean", "example": false },
                "error": { "type": "string" }
            }
        }
    })
}

#[allow(clippy::too_many_lines)]
fn paths() -> Value {
    json!({
        "/api/messages/send": {
            "post": {
                "tags": ["Messages"],
                "summary": "Send a WhatsApp text message",
                "requestBody": {
                    "required": true,
                    "content": json_content("SendMessageRequest")
                },
                "responses": {
                    "200": {
                        "description": "Message sent",
                        "content": json_content("SendMessageResponse")
                    },
                    "400": error_response("phone or message missing"),
                    "500": error_response("The WhatsApp client failed to send the message"),
                    "503": error_response("The WhatsApp client is not connected")
                }
            }
        },
        "/api/messages/status": {
            "get": {
                "tags": ["Messages"],
                "summary": "Check the WhatsApp connection",
                "responses": {
                    "200": {
                        "description": "Connection status",
                        "content": json_content("StatusResponse")
                    }
                }
            }
        },
        "/api/messages/qr": {
            "get": {
                "tags": ["Messages"],
                "summary": "Get the pairing QR code",
                "parameters": [{
                    "in": "query",
                    "name": "format",
                    "schema": {
                        "type": "string",
                        "enum": ["html", "png", "download"],
                        "default": "html"
                    },
                    "description": "html: page embedding the image; png: the raw image; \
                                    download: the image as an attachment"
                }],
                "responses": {
                    "200": {
                        "description": "QR page or image. \
                                        A status page is returned when no code is available.",
                        "content": {
                            "text/html": { "schema": { "type": "string" } },
                            "image/png": { "schema": { "type": "string", "format": "binary" } }
                        }
                    },
                    "500": error_response("The code could not be rendered")
                }
            }
        },
        "/api/messages/restart": {
            "post": {
                "tags": ["Messages"],
                "summary": "Restart the WhatsApp client in the background",
                "responses": {
                    "200": {
                        "description": "Restart started",
                        "content": json_content("ActionResponse")
                    }
                }
            }
        },
        "/api/messages/restart-server": {
            "post": {
                "tags": ["Messages"],
                "summary": "Exit the process so its supervisor restarts it",
                "responses": {
                    "200": {
                        "description": "Restart scheduled",
                        "content": json_content("ActionResponse")
                    },
                    "500": error_response("The restart could not be scheduled")
                }
            }
        },
        "/api/history": {
            "get": {
                "tags": ["History"],
                "summary": "Query the send history",
                "parameters": [
                    query_param("limit", json!({ "type": "integer", "default": 50 })),
                    query_param("status", json!({ "type": "string", "enum": ["sent", "failed"] })),
                    {
                        "in": "query",
                        "name": "phone",
                        "schema": { "type": "string" },
                        "description": "Case-insensitive substring of the recipient"
                    }
                ],
                "responses": {
                    "200": {
                        "description": "Matching records, newest first",
                        "content": json_content("HistoryResponse")
                    },
                    "400": error_response("Invalid query parameters"),
                    "503": error_response("History database unavailable")
                }
            }
        },
        "/api/history/clear": {
            "delete": {
                "tags": ["History"],
                "summary": "Delete records older than a number of days",
                "parameters": [
                    query_param("days", json!({ "type": "integer", "default": 30 }))
                ],
                "responses": {
                    "200": {
                        "description": "Records deleted",
                        "content": json_content("ActionResponse")
                    },
                    "400": error_response("Invalid query parameters"),
                    "500": error_response("History database error")
                }
            }
        }
    })
}
