// HTTP adapters consumed by the session-variant executor and the run
// controller's notification dispatch (§4.9, §4.10).

pub mod http_gateway;
pub mod webhook_notifier;

pub use http_gateway::HttpGatewayClient;
pub use webhook_notifier::WebhookNotifier;
