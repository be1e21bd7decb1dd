use std::env;

use evlog::{meta, LogEventConsolePrinter, Logger};

use pollsite::db::dbclient::DBClient;
use pollsite::runtime::{get_logger, set_logger};
use pollsite::web;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let db_url = env::var("POLLSITE_DATABASE_URL").expect("expected POLLSITE_DATABASE_URL");
    let http_addr =
        env::var("POLLSITE_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_owned());

    let mut logger = Logger::default();
    logger.register(LogEventConsolePrinter::default());
    set_logger(logger);

    let db_client = DBClient::new(&db_url).await
        .expect("failed to connect to database");
    db_client.ensure_schema().await
        .expect("failed to initialize database schema");

    if let Err(e) = web::serve(&http_addr, db_client).await {
        get_logger().error("Server error.", meta! {
            "Error" => e,
        });
    }
}
