//! # Command Dispatch
//!
//! JSON-lines front door for the commands: one request per line in, one
//! response per line out.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stdin                                                                  │
//! │  {"id":1,"command":"search_clients","args":{"query":"maria"}}          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  route() ─► commands::client::search_clients(db, session, config, ..)  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  stdout                                                                 │
//! │  {"id":1,"ok":true,"data":{"ticket":1,"rows":[...],"stale":false}}     │
//! │  {"id":2,"ok":false,"error":{"code":"CHECKOUT_ERROR","message":"..."}} │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Arguments use the same camelCase names as the response payloads.

use otica_core::payment::{CaptureRequest, DistributionMode, PaymentMethod};
use otica_core::registration::ClientDraft;
use otica_core::service_order::OsForm;
use otica_core::{Category, Discount, Money, TransactionKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::commands::client::PhotoUpload;
use crate::commands::{cart, client, config, payment, product, sale, service_order};
use crate::error::ApiError;
use crate::PosApp;

/// One command invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// Echoed back on the response.
    #[serde(default)]
    pub id: Option<Value>,
    pub command: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl Response {
    fn success(id: Option<Value>, data: Value) -> Self {
        Response {
            id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(id: Option<Value>, error: ApiError) -> Self {
        Response {
            id,
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchProductsArgs {
    query: String,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductArgs {
    category: Category,
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchClientsArgs {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitularArgs {
    titular_id: String,
}

#[derive(Deserialize)]
struct RegisterClientArgs {
    draft: ClientDraft,
    #[serde(default)]
    photo: Option<PhotoUpload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientIdArgs {
    client_id: String,
}

#[derive(Deserialize)]
struct DraftArgs {
    draft: ClientDraft,
}

#[derive(Deserialize)]
struct KindArgs {
    kind: TransactionKind,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionArgs {
    collection_id: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameArgs {
    collection_id: u32,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddToCartArgs {
    #[serde(default)]
    collection_id: Option<u32>,
    category: Category,
    product_id: String,
    #[serde(default)]
    quantity: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemArgs {
    collection_id: u32,
    product_id: String,
    category: Category,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateItemArgs {
    collection_id: u32,
    product_id: String,
    category: Category,
    quantity: i64,
}

#[derive(Deserialize)]
struct DiscountArgs {
    discount: Discount,
}

#[derive(Deserialize)]
struct ObservacoesArgs {
    #[serde(default)]
    observacoes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OsFormArgs {
    collection_id: u32,
    form: OsForm,
}

#[derive(Deserialize)]
struct ModeArgs {
    mode: DistributionMode,
}

#[derive(Deserialize)]
struct IndexArgs {
    index: usize,
}

#[derive(Deserialize)]
struct MethodArgs {
    index: usize,
    method: PaymentMethod,
}

#[derive(Deserialize)]
struct ValueArgs {
    index: usize,
    value: Money,
}

#[derive(Deserialize)]
struct ProcessArgs {
    index: usize,
    request: CaptureRequest,
}

#[derive(Deserialize)]
struct TransactionArgs {
    kind: TransactionKind,
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaleIdArgs {
    sale_id: String,
}

#[derive(Deserialize)]
struct CentsArgs {
    cents: i64,
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T, ApiError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| ApiError::bad_request(format!("Invalid arguments: {}", e)))
}

fn reply<T: Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}

// =============================================================================
// Routing
// =============================================================================

/// Runs one request against the app state.
pub async fn dispatch(app: &PosApp, request: Request) -> Response {
    let Request { id, command, args } = request;
    match route(app, &command, args).await {
        Ok(data) => Response::success(id, data),
        Err(error) => {
            debug!(command = %command, code = ?error.code, "Command failed");
            Response::failure(id, error)
        }
    }
}

async fn route(app: &PosApp, command: &str, args: Value) -> Result<Value, ApiError> {
    let PosApp { db, session, config } = app;

    match command {
        // Config commands
        "get_config" => reply(config::get_config(config)),
        "format_currency" => {
            let a: CentsArgs = parse(args)?;
            reply(config::format_currency(config, a.cents))
        }

        // Product commands
        "search_products" => {
            let a: SearchProductsArgs = parse(args)?;
            reply(product::search_products(db, config, a.query, a.categories, a.limit).await)
        }
        "get_product" => {
            let a: ProductArgs = parse(args)?;
            reply(product::get_product(db, config, a.category, a.id).await?)
        }

        // Client commands
        "search_clients" => {
            let a: SearchClientsArgs = parse(args)?;
            reply(client::search_clients(db, session, config, a.query, a.limit).await)
        }
        "get_client" => {
            let a: IdArgs = parse(args)?;
            reply(client::get_client(db, a.id).await?)
        }
        "list_dependents" => {
            let a: TitularArgs = parse(args)?;
            reply(client::list_dependents(db, a.titular_id).await?)
        }
        "register_client" => {
            let a: RegisterClientArgs = parse(args)?;
            reply(client::register_client(db, a.draft, a.photo).await?)
        }
        "select_client" => {
            let a: ClientIdArgs = parse(args)?;
            reply(client::select_client(db, session, a.client_id).await?)
        }
        "select_temporary_client" => {
            let a: DraftArgs = parse(args)?;
            reply(client::select_temporary_client(db, session, a.draft).await?)
        }
        "clear_client" => reply(client::clear_client(session)),

        // Cart commands
        "get_cart" => reply(cart::get_cart(session)),
        "set_transaction_kind" => {
            let a: KindArgs = parse(args)?;
            reply(cart::set_transaction_kind(session, a.kind))
        }
        "add_collection" => reply(cart::add_collection(session)),
        "set_active_collection" => {
            let a: CollectionArgs = parse(args)?;
            reply(cart::set_active_collection(session, a.collection_id)?)
        }
        "rename_collection" => {
            let a: RenameArgs = parse(args)?;
            reply(cart::rename_collection(session, a.collection_id, a.name)?)
        }
        "remove_collection" => {
            let a: CollectionArgs = parse(args)?;
            reply(cart::remove_collection(session, a.collection_id)?)
        }
        "add_to_cart" => {
            let a: AddToCartArgs = parse(args)?;
            reply(
                cart::add_to_cart(
                    db,
                    session,
                    config,
                    a.collection_id,
                    a.category,
                    a.product_id,
                    a.quantity,
                )
                .await?,
            )
        }
        "update_cart_item" => {
            let a: UpdateItemArgs = parse(args)?;
            reply(cart::update_cart_item(
                session,
                a.collection_id,
                a.product_id,
                a.category,
                a.quantity,
            )?)
        }
        "remove_from_cart" => {
            let a: ItemArgs = parse(args)?;
            reply(cart::remove_from_cart(session, a.collection_id, a.product_id, a.category)?)
        }
        "set_discount" => {
            let a: DiscountArgs = parse(args)?;
            reply(cart::set_discount(session, a.discount)?)
        }
        "set_observacoes" => {
            let a: ObservacoesArgs = parse(args)?;
            reply(cart::set_observacoes(session, a.observacoes))
        }
        "clear_session" => reply(cart::clear_session(session)),

        // Service order commands
        "open_os_form" => {
            let a: CollectionArgs = parse(args)?;
            reply(service_order::open_os_form(session, a.collection_id)?)
        }
        "submit_os_form" => {
            let a: OsFormArgs = parse(args)?;
            reply(service_order::submit_os_form(session, a.collection_id, a.form)?)
        }
        "get_service_orders" => reply(service_order::get_service_orders(session)),
        "get_prescription_options" => reply(service_order::get_prescription_options()),

        // Payment commands
        "get_payments" => reply(payment::get_payments(session)),
        "set_payment_mode" => {
            let a: ModeArgs = parse(args)?;
            reply(payment::set_payment_mode(session, a.mode))
        }
        "add_payment" => reply(payment::add_payment(session)?),
        "remove_payment" => {
            let a: IndexArgs = parse(args)?;
            reply(payment::remove_payment(session, a.index)?)
        }
        "change_payment_method" => {
            let a: MethodArgs = parse(args)?;
            reply(payment::change_payment_method(session, a.index, a.method)?)
        }
        "set_payment_value" => {
            let a: ValueArgs = parse(args)?;
            reply(payment::set_payment_value(session, a.index, a.value)?)
        }
        "process_payment" => {
            let a: ProcessArgs = parse(args)?;
            reply(payment::process_payment(session, a.index, a.request)?)
        }

        // Sale commands
        "finalize_transaction" => reply(sale::finalize_transaction(db, session, config).await?),
        "get_transaction" => {
            let a: TransactionArgs = parse(args)?;
            reply(sale::get_transaction(db, config, a.kind, a.id).await?)
        }
        "list_transactions" => {
            let a: KindArgs = parse(args)?;
            reply(sale::list_transactions(db, config, a.kind).await?)
        }
        "get_sale_service_orders" => {
            let a: SaleIdArgs = parse(args)?;
            reply(sale::get_sale_service_orders(db, config, a.sale_id).await?)
        }

        other => Err(ApiError::bad_request(format!("Unknown command: {}", other))),
    }
}

// =============================================================================
// Line Loop
// =============================================================================

/// Answers every request line read from `reader` until end of input.
///
/// Blank lines are skipped. A line that is not a request gets a
/// `BAD_REQUEST` response and the loop goes on.
///
/// Requests are answered one at a time, so client lookups from this loop
/// never overtake each other. Hosts that run lookups concurrently go
/// through `client::answer_client_search` with their own tickets.
pub async fn serve<R, W>(app: &PosApp, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => dispatch(app, request).await,
            Err(e) => {
                warn!(error = %e, "Malformed request line");
                Response::failure(None, ApiError::bad_request(format!("Malformed request: {}", e)))
            }
        };

        let mut out = serde_json::to_vec(&response)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConfigState;
    use otica_db::{Database, DbConfig};
    use serde_json::json;

    async fn app() -> PosApp {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let blob_dir = std::env::temp_dir().join(format!("otica-dispatch-{}", uuid::Uuid::new_v4()));
        PosApp::with_database(ConfigState::default(), db, blob_dir)
    }

    fn request(value: Value) -> Request {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_command_is_bad_request() {
        let app = app().await;

        let response = dispatch(&app, request(json!({ "id": 7, "command": "print_receipt" }))).await;

        assert!(!response.ok);
        assert_eq!(response.id, Some(json!(7)));
        let error = response.error.unwrap();
        assert_eq!(error.code, crate::error::ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn test_missing_arguments_are_bad_request() {
        let app = app().await;

        let response = dispatch(&app, request(json!({ "command": "remove_collection" }))).await;

        assert!(!response.ok);
        assert!(response.error.unwrap().message.starts_with("Invalid arguments"));
    }

    #[tokio::test]
    async fn test_collection_commands_round_trip() {
        let app = app().await;

        let added = dispatch(&app, request(json!({ "command": "add_collection" }))).await;
        assert!(added.ok);
        let data = added.data.unwrap();
        assert_eq!(data["collections"].as_array().map(Vec::len), Some(2));
        let second = data["activeCollectionId"].clone();

        let renamed = dispatch(
            &app,
            request(json!({
                "command": "rename_collection",
                "args": { "collectionId": second, "name": "Óculos de sol" }
            })),
        )
        .await;
        assert!(renamed.ok);
        assert_eq!(renamed.data.unwrap()["collections"][1]["name"], "Óculos de sol");
    }

    #[tokio::test]
    async fn test_finalize_with_empty_cart_reports_checkout_error() {
        let app = app().await;

        let response = dispatch(&app, request(json!({ "command": "finalize_transaction" }))).await;

        let error = response.error.unwrap();
        assert_eq!(error.code, crate::error::ErrorCode::CheckoutError);
        assert!(error.message.contains("Cart empty"));
    }

    #[tokio::test]
    async fn test_serve_answers_each_line() {
        let app = app().await;
        let input = concat!(
            "{\"id\":1,\"command\":\"get_cart\"}\n",
            "\n",
            "not json\n",
            "{\"id\":2,\"command\":\"format_currency\",\"args\":{\"cents\":123456}}\n",
        );
        let mut output = Vec::new();

        serve(&app, input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["ok"], true);
        assert_eq!(lines[1]["error"]["code"], "BAD_REQUEST");
        assert_eq!(lines[2]["data"]["formatted"], "R$ 1.234,56");
    }
}
