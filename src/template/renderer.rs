//! Frontend/backend stanza rendering.

use std::fmt::Write as _;
use std::path::Path;

use thiserror::Error;

use crate::engine::intent::RoutingIntent;
use crate::storage::FileSystem;

/// Listener lines shared by every generated frontend.
const BIND_BLOCK: &str = "\tbind *:80\n\tbind *:443\n\toption http-server-close\n";

#[derive(Debug, Error)]
pub enum TemplateError {
    /// The custom template file could not be read.
    #[error("Could not read consul template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Render the template of one service.
///
/// A set `consul_template_path` wins over generation and is returned as read.
pub async fn render(intent: &RoutingIntent, fs: &dyn FileSystem) -> Result<String, TemplateError> {
    if !intent.consul_template_path.is_empty() {
        let path = &intent.consul_template_path;
        return fs
            .read_to_string(Path::new(path))
            .await
            .map_err(|source| TemplateError::Read {
                path: path.clone(),
                source,
            });
    }
    Ok(render_generated(intent))
}

/// Generate the frontend and backend stanzas from the intent fields.
pub fn render_generated(intent: &RoutingIntent) -> String {
    let name = &intent.service_name;
    let op = intent.path_type.as_str();
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "frontend {}-fe", name);
    out.push_str(BIND_BLOCK);

    let _ = write!(out, "\tacl url_{}", name);
    for path in &intent.service_path {
        let _ = write!(out, " {} {}", op, path);
    }
    out.push('\n');

    let mut condition = format!("url_{}", name);
    if !intent.service_domain.is_empty() {
        let _ = writeln!(
            out,
            "\tacl domain_{} hdr_dom(host) -i {}",
            name, intent.service_domain
        );
        let _ = write!(condition, " domain_{}", name);
    }
    let _ = writeln!(out, "\tuse_backend {}-be if {}", name, condition);

    out.push('\n');
    let _ = writeln!(out, "backend {}-be", name);
    let _ = writeln!(
        out,
        "\t{{{{range $i, $e := service \"{}\" \"any\"}}}}",
        intent.discovery_name()
    );
    out.push_str("\tserver {{$e.Node}}_{{$i}}_{{$e.Port}} {{$e.Address}}:{{$e.Port}}");
    if !intent.skip_check {
        out.push_str(" check");
    }
    out.push('\n');
    out.push_str("\t{{end}}");

    out
}
