//! TCP transport with an optional in-place TLS upgrade

use super::{Transport, TransportConfig, TransportError};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

#[cfg(feature = "tls")]
use rustls::pki_types::ServerName;
#[cfg(feature = "tls")]
use std::sync::Arc;
#[cfg(feature = "tls")]
use tokio_rustls::{client::TlsStream, TlsConnector};

/// The stream currently owned by the transport
enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<TlsStream<TcpStream>>),
}

impl Stream {
    fn io(&mut self) -> &mut (dyn IoStream + Send) {
        match self {
            Stream::Plain(stream) => stream,
            #[cfg(feature = "tls")]
            Stream::Tls(stream) => stream.as_mut(),
        }
    }
}

trait IoStream: AsyncRead + AsyncWrite + Unpin {}

impl<T: AsyncRead + AsyncWrite + Unpin> IoStream for T {}

/// TCP transport
pub struct TcpTransport {
    stream: Option<Stream>,
    config: TransportConfig,
    #[cfg(feature = "tls")]
    tls_config: Option<Arc<rustls::ClientConfig>>,
}

impl TcpTransport {
    /// Create a new TCP transport
    pub fn new(config: TransportConfig) -> Self {
        Self {
            stream: None,
            config,
            #[cfg(feature = "tls")]
            tls_config: None,
        }
    }

    /// Create with default configuration
    pub fn new_default() -> Self {
        Self::new(TransportConfig::default())
    }

    /// Share a prebuilt rustls configuration instead of building one lazily
    #[cfg(feature = "tls")]
    pub fn with_tls_config(mut self, tls_config: Arc<rustls::ClientConfig>) -> Self {
        self.tls_config = Some(tls_config);
        self
    }

    fn stream(&mut self) -> Result<&mut (dyn IoStream + Send), TransportError> {
        self.stream
            .as_mut()
            .map(Stream::io)
            .ok_or(TransportError::NotConnected)
    }

    #[cfg(feature = "tls")]
    fn connector(&mut self) -> Result<TlsConnector, TransportError> {
        let tls_config = match &self.tls_config {
            Some(tls_config) => Arc::clone(tls_config),
            None => {
                let built = Arc::new(super::build_tls_config(self.config.insecure)?);
                self.tls_config = Some(Arc::clone(&built));
                built
            }
        };
        Ok(TlsConnector::from(tls_config))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self, addr: &str) -> Result<(), TransportError> {
        self.stream = None;

        let stream = match self.config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| TransportError::Timeout)?,
            None => TcpStream::connect(addr).await,
        }
        .map_err(TransportError::Io)?;

        if self.config.nodelay {
            stream.set_nodelay(true).ok();
        }

        self.stream = Some(Stream::Plain(stream));
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream()?;
        stream.write_all(data).await?;
        // TLS buffers records until flushed
        stream.flush().await?;
        Ok(())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let stream = self.stream()?;
        let n = stream.read(buf).await?;

        if n == 0 && !buf.is_empty() {
            return Err(TransportError::Closed);
        }

        Ok(n)
    }

    async fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let stream = self.stream()?;
        match stream.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(TransportError::Closed),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    #[cfg(feature = "tls")]
    async fn upgrade_tls(&mut self, server_name: &str) -> Result<(), TransportError> {
        let connector = self.connector()?;
        let server_name = ServerName::try_from(server_name.to_string())
            .map_err(|e| TransportError::Tls(format!("Invalid server name: {}", e)))?;

        let tcp_stream = match self.stream.take() {
            Some(Stream::Plain(stream)) => stream,
            Some(tls @ Stream::Tls(_)) => {
                self.stream = Some(tls);
                return Err(TransportError::Tls("Stream is already encrypted".to_string()));
            }
            None => return Err(TransportError::NotConnected),
        };

        let tls_stream = connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        self.stream = Some(Stream::Tls(Box::new(tls_stream)));
        Ok(())
    }

    #[cfg(not(feature = "tls"))]
    async fn upgrade_tls(&mut self, _server_name: &str) -> Result<(), TransportError> {
        Err(TransportError::Tls(
            "built without the `tls` feature".to_string(),
        ))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream.io().shutdown().await.ok();
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_transport() {
        // Start a simple echo server
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(&buf[..n]).await.unwrap();
        });

        let mut transport = TcpTransport::new_default();
        transport.connect(&addr.to_string()).await.unwrap();
        assert!(transport.is_connected());

        let msg = b"Hello, TCP!";
        transport.send(msg).await.unwrap();

        let mut buf = [0u8; 11];
        transport.recv_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, msg);

        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_end_of_stream_is_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let mut transport = TcpTransport::new_default();
        transport.connect(&addr.to_string()).await.unwrap();
        server.await.unwrap();

        let mut buf = [0u8; 16];
        assert!(matches!(
            transport.recv(&mut buf).await,
            Err(TransportError::Closed)
        ));

        let mut reply = [0u8; 8];
        assert!(matches!(
            transport.recv_exact(&mut reply).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_refused_connection() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut transport = TcpTransport::new_default();
        let result = transport.connect(&addr.to_string()).await;
        assert!(matches!(result, Err(TransportError::Io(_))));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let mut transport = TcpTransport::new_default();
        assert!(matches!(
            transport.send(b"x").await,
            Err(TransportError::NotConnected)
        ));
    }
}
