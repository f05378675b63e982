pub mod events;
pub mod geocoder;

/// Serves `app` on an ephemeral local port and returns its base URL.
#[cfg(test)]
pub(crate) fn serve_stub(app: axum::Router) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);

    format!("http://{}", addr)
}
