use crate::cmd::open_store;
use std::path::Path;

pub fn run(root: &Path, port: u16) -> anyhow::Result<()> {
    let (config, db) = open_store(root)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        println!("leadflow API → http://localhost:{actual_port}");

        tokio::select! {
            res = leadflow_server::serve_on(db, config, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
