use std::{env, fs, process::Command, sync::Arc};

use clap::Parser;
use cli::{split_package_spec, Args, Commands};
use error::{CliError, CliResult};
use logging::setup_logging;
use npmpeek_config::{
    config::{self, config_path, generate_default_config, get_config, set_config_path, Config},
    server::Transport,
};
use npmpeek_dl::http_client::configure_http_client;
use npmpeek_mcp::{serve_stdio, HttpTransport, McpServer};
use npmpeek_operations::{
    fetch::fetch_package_code, info::get_package_info, list::list_package_files,
    popular::popular_packages, search::search_packages, NpmContext,
};
use npmpeek_utils::path::resolve_path;
use nu_ansi_term::Color::Green;
use tracing::{info, warn};
use ureq::{
    http::{HeaderMap, HeaderName, HeaderValue},
    Proxy,
};
use utils::{disable_color, Colored};

mod cli;
mod error;
mod logging;
mod utils;

fn parse_headers(headers: &[String]) -> CliResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for header in headers {
        let invalid = || CliError::InvalidHeader(header.clone());
        let (key, value) = header.split_once(':').ok_or_else(invalid)?;
        let key: HeaderName = key.trim().parse().map_err(|_| invalid())?;
        let value: HeaderValue = value.trim().parse().map_err(|_| invalid())?;
        map.append(key, value);
    }
    Ok(map)
}

fn configure_client(
    proxy: Option<&str>,
    headers: Option<&[String]>,
    user_agent: Option<String>,
    config: &Config,
) -> CliResult<()> {
    let proxy = proxy
        .map(|proxy| {
            Proxy::new(proxy).map_err(|err| {
                CliError::InvalidProxy {
                    proxy: proxy.to_string(),
                    reason: err.to_string(),
                }
            })
        })
        .transpose()?;
    let headers = headers.map(parse_headers).transpose()?;
    let user_agent = user_agent.unwrap_or_else(|| config.user_agent());

    configure_http_client(|client| {
        if proxy.is_some() {
            client.proxy = proxy;
        }
        if headers.is_some() {
            client.headers = headers;
        }
        client.user_agent = Some(user_agent);
    });
    Ok(())
}

/// Runs a blocking operation off the async runtime.
async fn blocking<T, F>(ctx: &Arc<NpmContext>, op: F) -> CliResult<T>
where
    T: Send + 'static,
    F: FnOnce(&NpmContext) -> npmpeek_operations::Result<T> + Send + 'static,
{
    let ctx = Arc::clone(ctx);
    Ok(tokio::task::spawn_blocking(move || op(ctx.as_ref())).await??)
}

async fn serve(
    ctx: Arc<NpmContext>,
    transport: Option<Transport>,
    bind: Option<String>,
    auth_token: Option<String>,
) -> CliResult<()> {
    let config = ctx.config();
    let transport = match transport {
        Some(transport) => transport,
        None => config.transport()?,
    };
    let bind = bind.unwrap_or_else(|| config.bind());
    let auth_token = auth_token.or_else(|| config.auth_token());
    let server = McpServer::new(ctx);

    match transport {
        Transport::Stdio => {
            if auth_token.is_some() {
                warn!("auth_token only applies to the http transport");
            }
            serve_stdio(server).await?;
        }
        Transport::Http => {
            let listener = HttpTransport::bind(&bind).await?;
            HttpTransport::new(server, auth_token)
                .serve(listener)
                .await?;
        }
    }
    Ok(())
}

fn print_config(edit: Option<Option<String>>) -> CliResult<()> {
    let config_path = config_path();
    if let Some(editor) = edit {
        let editor = editor
            .or_else(|| env::var("EDITOR").ok())
            .unwrap_or_else(|| "vi".to_string());
        Command::new(&editor)
            .arg(&config_path)
            .status()
            .map_err(|source| {
                CliError::Io {
                    action: format!("run {} {}", editor, config_path.display()),
                    source,
                }
            })?;
        return Ok(());
    }

    let content = match fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file {} not found", config_path.display());
            Config::default_config().to_annotated_document()?.to_string()
        }
        Err(source) => {
            return Err(CliError::Io {
                action: format!("read {}", config_path.display()),
                source,
            });
        }
    };
    println!("{content}");
    Ok(())
}

async fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        disable_color();
    }

    if let Some(ref c) = args.config {
        let path = resolve_path(c)?;
        let path = if path.is_absolute() {
            path
        } else {
            env::current_dir()
                .map_err(|source| {
                    CliError::Io {
                        action: "read the current directory".into(),
                        source,
                    }
                })?
                .join(path)
        };
        set_config_path(path);
    }

    match args.command {
        Commands::DefConfig => {
            let path = generate_default_config()?;
            info!("Default config written to {}", Colored(Green, path.display()));
        }
        Commands::Config {
            edit,
        } => print_config(edit)?,
        command => {
            config::init()?;
            let config = get_config();
            configure_client(
                args.proxy.as_deref(),
                args.header.as_deref(),
                args.user_agent.clone(),
                &config,
            )?;

            let ctx = Arc::new(NpmContext::new(config));

            match command {
                Commands::Serve {
                    transport,
                    bind,
                    auth_token,
                } => serve(ctx, transport, bind, auth_token).await?,
                Commands::Fetch {
                    package,
                    file_path,
                } => {
                    let report = blocking(&ctx, move |ctx| {
                        let (name, version) = split_package_spec(&package);
                        fetch_package_code(ctx, name, version, file_path.as_deref())
                    })
                    .await?;
                    println!("{report}");
                }
                Commands::Files {
                    package,
                } => {
                    let listing = blocking(&ctx, move |ctx| {
                        let (name, version) = split_package_spec(&package);
                        list_package_files(ctx, name, version)
                    })
                    .await?;
                    println!("{listing}");
                }
                Commands::Info {
                    package,
                } => {
                    let info = blocking(&ctx, move |ctx| {
                        let (name, version) = split_package_spec(&package);
                        get_package_info(ctx, name, version)
                    })
                    .await?;
                    println!("{info}");
                }
                Commands::Search {
                    query,
                    limit,
                    from,
                } => {
                    let report =
                        blocking(&ctx, move |ctx| search_packages(ctx, &query, limit, from))
                            .await?;
                    println!("{report}");
                }
                Commands::Popular => {
                    let digest = blocking(&ctx, popular_packages).await?;
                    println!("{digest}");
                }
                Commands::DefConfig | Commands::Config { .. } => unreachable!(),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli().await {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers() {
        let headers =
            parse_headers(&["Authorization: Bearer abc".into(), "x-npm-scope:acme".into()])
                .unwrap();
        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers["x-npm-scope"], "acme");

        assert!(matches!(
            parse_headers(&["no-colon".into()]),
            Err(CliError::InvalidHeader(h)) if h == "no-colon"
        ));
        assert!(parse_headers(&["bad name: x".into()]).is_err());
    }
}
