use std::sync::Arc;

use crate::config::Config;
use crate::registry::{populate::populated_resolver, SystemClock};
use crate::relay::{self, RelayState};
use crate::{die, ServeArgs};

pub(crate) async fn serve_cmd(config: &Config, args: &ServeArgs) {
    let server = &config.server;

    let host = args.host.as_deref().unwrap_or(&server.host);
    let port = args.port.unwrap_or(server.port);

    let resolver = match populated_resolver(config, Arc::new(SystemClock)) {
        Ok(resolver) => resolver,
        Err(err) => die!("failed to configure providers: {}", err),
    };

    let state = match RelayState::new(resolver, config) {
        Ok(state) => state,
        Err(err) => die!("failed to create the HTTP client: {}", err),
    };

    let router = relay::router(state, &server.cors_origin, &server.static_dir);

    if let Err(err) = relay::serve(router, host, port).await {
        die!("failed to serve on {}:{}: {}", host, port, err);
    }
}
