//! Plugins compiled into every host binary

pub mod admin;
pub mod help;
pub mod ping;

use super::catalog::PluginCatalog;
use super::trait_def::Plugin;

pub fn register_builtins(catalog: &mut PluginCatalog) {
    catalog
        .register("help", |ctx| Ok(Box::new(help::HelpPlugin::new(ctx.host)) as Box<dyn Plugin>))
        .register("plugins", |ctx| Ok(Box::new(admin::AdminPlugin::new(ctx.host)) as Box<dyn Plugin>))
        .register("ping", |_ctx| Ok(Box::new(ping::PingPlugin) as Box<dyn Plugin>));
}

/// Manifests for the built-in plugins, written by `init-config`
pub const DEFAULT_MANIFESTS: [(&str, &str); 3] = [
    ("help.yaml", "entry: help\ndescription: Lists available commands\n"),
    ("plugins.yaml", "entry: plugins\ndescription: Plugin management for the owner\n"),
    ("ping.yaml", "entry: ping\ndescription: Liveness checks\n"),
];
