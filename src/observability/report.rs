//! Startup route summary.
//!
//! One log line per route with its backend target and the identity the
//! remote API sees. Identity lookups happen once per distinct connection
//! context; a failed lookup is reported but never blocks startup.

use std::collections::HashMap;

use crate::remote::{ConnectionContext, Identity, RemoteDescriptor};
use crate::routing::RouteTable;

pub async fn log_route_summary(table: &RouteTable, descriptor: &dyn RemoteDescriptor) {
    let mut identities: HashMap<&ConnectionContext, Option<Identity>> = HashMap::new();

    for route in table.iter() {
        let ctx = &route.entry.context;
        if !identities.contains_key(ctx) {
            let identity = match descriptor.identity(ctx).await {
                Ok(identity) => Some(identity),
                Err(e) => {
                    tracing::warn!(region = %ctx.region, error = %e, "Couldn't resolve caller identity");
                    None
                }
            };
            identities.insert(ctx, identity);
        }
        let identity = identities.get(ctx).and_then(Option::as_ref);

        let entry = &route.entry;
        tracing::info!(
            path = %entry.effective_path,
            pattern = %route.template.pattern(),
            methods = ?entry.methods,
            rest_api_id = %entry.rest_api_id,
            resource_id = %entry.resource_id,
            account_id = identity.map_or("-", |i| i.account_id.as_str()),
            region = %ctx.region,
            identity = identity.map_or("-", |i| i.principal.as_str()),
            "Route"
        );
    }
}
