//! # Module Server - API de haut niveau pour Axum
//!
//! Ce module fournit une abstraction simple et ergonomique pour créer des serveurs HTTP
//! avec Axum, en cachant la complexité de la configuration et du routage.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **Routes JSON simples** : Ajoutez des endpoints API avec `add_route()`
//! - 🔀 **Redirections** : Redirigez des routes avec `add_redirect()`
//! - 🎯 **Handlers personnalisés** : Support SSE, WebSocket, etc. avec `add_handler_with_state()`
//! - 📚 **Documentation API** : OpenAPI/Swagger automatique avec `add_openapi()`
//! - ⚡ **Arrêt gracieux** : `stop()` termine les connexions en cours

use crate::logs::{
    LoggingOptions, LogsApiDoc, create_logs_router, init_logging, log_dump, log_sse,
};
use anyhow::{Context, Result};
use axum::handler::Handler;
use axum::response::Redirect;
use axum::routing::get;
use axum::{Json, Router};
use pmoconfig::get_config;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Info serveur sérialisable
#[derive(Clone, Serialize, utoipa::ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
}

/// Serveur principal
pub struct Server {
    name: String,
    base_url: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    join_handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    shutdown: CancellationToken,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `base_url` - Nom d'hôte annoncé (ex: "localhost")
    /// * `http_port` - Port HTTP à écouter, `0` pour un port libre
    ///
    /// # Exemple
    ///
    /// ```rust
    /// # use pmoserver::Server;
    /// let server = Server::new("MyAPI", "localhost", 3000);
    /// ```
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            join_handle: None,
            local_addr: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn new_configured() -> Self {
        ServerBuilder::new_configured().build()
    }

    /// Ajoute une route JSON dynamique
    ///
    /// Crée un endpoint qui retourne du JSON. La closure fournie sera appelée
    /// à chaque requête GET sur le chemin spécifié.
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use pmoserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// # let mut server = Server::new("Test", "localhost", 3000);
    /// server.add_route("/info", || async {
    ///     serde_json::json!({
    ///         "status": "online",
    ///         "version": "1.0.0"
    ///     })
    /// }).await;
    /// # }
    /// ```
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = move || {
            let f = f.clone();
            async move { Json(f().await) }
        };

        self.mount(path, Router::new().route("/", get(handler))).await;
    }

    /// Ajoute un handler GET avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route("/", get(handler)).with_state(state);
        self.mount(path, route).await;
    }

    /// Ajoute une redirection HTTP permanente (308)
    ///
    /// ```rust,no_run
    /// # use pmoserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// # let mut server = Server::new("Test", "localhost", 3000);
    /// server.add_redirect("/", "/swagger-ui/jukebox").await;
    /// # }
    /// ```
    pub async fn add_redirect(&mut self, from: &str, to: &str) {
        let target = to.to_string();
        let route = Router::new().route(
            "/",
            get(move || async move { Redirect::permanent(&target) }),
        );
        self.mount(from, route).await;
    }

    /// Ajoute une API documentée avec OpenAPI et Swagger UI
    ///
    /// Chaque appel ajoute une API distincte :
    ///
    /// - les routes sont montées sous `/api/{name}`
    /// - `/swagger-ui/{name}` affiche la documentation Swagger
    /// - `/api-docs/{name}.json` fournit la spécification OpenAPI
    pub async fn add_openapi(
        &mut self,
        api_router: Router,
        openapi: utoipa::openapi::OpenApi,
        name: &str,
    ) {
        let swagger_path = format!("/swagger-ui/{}", name);
        let swagger_path_static: &'static str = Box::leak(swagger_path.into_boxed_str());

        let openapi_json_path = format!("/api-docs/{}.json", name);
        let openapi_json_path_static: &'static str = Box::leak(openapi_json_path.into_boxed_str());

        let swagger = SwaggerUi::new(swagger_path_static).url(openapi_json_path_static, openapi);

        let base_path = format!("/api/{}", name);
        let nested_router = Router::new().nest(&base_path, api_router);

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(nested_router).merge(swagger);
    }

    async fn mount(&mut self, path: &str, route: Router) {
        let mut r = self.router.write().await;
        *r = if path == "/" {
            std::mem::take(&mut *r).merge(route)
        } else {
            std::mem::take(&mut *r).nest(path, route)
        };
    }

    /// Démarre le serveur HTTP
    ///
    /// Le port est réservé avant le retour : une erreur de bind est remontée
    /// à l'appelant. Les routes ajoutées après le démarrage ne sont pas servies.
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use pmoserver::Server;
    /// # #[tokio::main]
    /// # async fn main() -> anyhow::Result<()> {
    /// # let mut server = Server::new("Test", "localhost", 3000);
    /// server.start().await?;
    /// tokio::signal::ctrl_c().await?;
    /// server.stop().await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&mut self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Cannot listen on {}", addr))?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        info!(
            "Server {} running at http://{}:{}",
            self.name,
            self.base_url,
            local_addr.port()
        );

        let router = self.router.read().await.clone();
        let shutdown = self.shutdown.clone().cancelled_owned();
        let name = self.name.clone();
        self.join_handle = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Server {} stopped on error: {}", name, e);
            }
        }));
        Ok(())
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    /// Arrêt gracieux : plus de nouvelles connexions, attente des requêtes en cours
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        self.wait().await;
        info!("Server {} stopped", self.name);
    }

    /// Adresse effectivement écoutée, une fois le serveur démarré
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Récupère les infos du serveur
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            http_port: self.local_addr.map_or(self.http_port, |a| a.port()),
        }
    }

    /// Initialise le système de logging et enregistre les routes de logs
    ///
    /// Routes enregistrées :
    ///
    /// - `GET /log-sse` : flux SSE des logs
    /// - `GET /log-dump` : contenu JSON du buffer
    /// - `GET|POST /api/logs/log_setup` : lecture et réglage du niveau
    pub async fn init_logging(&mut self, options: LoggingOptions) {
        let log_state = init_logging(options);

        self.add_handler_with_state("/log-sse", log_sse, log_state.clone())
            .await;
        self.add_handler_with_state("/log-dump", log_dump, log_state.clone())
            .await;
        self.add_openapi(
            create_logs_router(log_state),
            LogsApiDoc::openapi(),
            "logs",
        )
        .await;
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    base_url: String,
    http_port: u16,
}

impl ServerBuilder {
    /// Crée un nouveau builder
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
        }
    }

    /// Builder initialisé depuis la section `host` de la configuration
    pub fn new_configured() -> Self {
        let config = get_config();
        Self {
            name: "PMOJukebox".to_string(),
            base_url: config.get_base_url(),
            http_port: config.get_http_port(),
        }
    }

    pub fn http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    /// Construit le serveur
    ///
    /// ```rust
    /// # use pmoserver::ServerBuilder;
    /// let server = ServerBuilder::new("MyAPI", "localhost", 3000)
    ///     .http_port(0)
    ///     .build();
    /// ```
    pub fn build(self) -> Server {
        Server::new(self.name, self.base_url, self.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    async fn call(server: &Server, uri: &str) -> axum::response::Response {
        let router = server.router.read().await.clone();
        router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_route_serves_json() {
        let mut server = Server::new("Test", "localhost", 0);
        server
            .add_route("/info", || async { serde_json::json!({"version": "1.0"}) })
            .await;

        let response = call(&server, "/info").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["version"], "1.0");
    }

    #[tokio::test]
    async fn test_redirect_and_openapi_mount() {
        #[derive(utoipa::OpenApi)]
        #[openapi(info(title = "test", version = "0.1.0"))]
        struct TestDoc;

        let mut server = Server::new("Test", "localhost", 0);
        server.add_redirect("/", "/swagger-ui/test").await;
        let api = Router::new().route("/ping", get(|| async { "pong" }));
        server.add_openapi(api, TestDoc::openapi(), "test").await;

        let response = call(&server, "/").await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/swagger-ui/test"
        );

        let response = call(&server, "/api/test/ping").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = call(&server, "/api-docs/test.json").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_start_then_stop() {
        let mut server = ServerBuilder::new("Test", "localhost", 8080)
            .http_port(0)
            .build();
        server.add_route("/info", || async { "up" }).await;
        server.start().await.unwrap();

        let addr = server.local_addr().unwrap();
        assert_eq!(server.info().http_port, addr.port());

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", addr.port()))
            .await
            .unwrap();
        stream
            .write_all(b"GET /info HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));

        tokio::time::timeout(std::time::Duration::from_secs(2), server.stop())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_start_fails_on_busy_port() {
        let busy = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = busy.local_addr().unwrap().port();

        let mut server = Server::new("Test", "localhost", port);
        assert!(server.start().await.is_err());
        assert!(server.local_addr().is_none());
    }
}
