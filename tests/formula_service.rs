//! The CodeCogs adapter against a local fake formula service.
#![cfg(feature = "codecogs")]

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use mathshot::{CodecogsClient, Error, FormulaSource, Rasterizer, RendererConfig};
use std::io::Cursor;
use std::sync::mpsc;
use tiny_http::{Response, Server};

fn formula_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(30, 12, Rgba([0, 0, 0, 200])));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Serve `requests` responses with `status`, reporting each request URL.
fn start_service(status: u16, body: Vec<u8>, requests: usize) -> (String, mpsc::Receiver<String>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for _ in 0..requests {
            let Ok(request) = server.recv() else {
                return;
            };
            let _ = tx.send(request.url().to_string());
            let resp = Response::from_data(body.clone())
                .with_status_code(status)
                .with_header("Content-Type: image/png".parse::<tiny_http::Header>().unwrap());
            let _ = request.respond(resp);
        }
    });
    (format!("http://{}/png.latex", addr), rx)
}

fn client_for(endpoint: String) -> CodecogsClient {
    let config = RendererConfig {
        formula_endpoint: endpoint,
        timeout_ms: 5000,
        ..RendererConfig::default()
    };
    CodecogsClient::new(&config).expect("client")
}

#[test]
fn fetches_png_with_dpi_prefix() {
    let (endpoint, urls) = start_service(200, formula_png(), 1);
    let client = client_for(endpoint);

    let body = client.fetch(r"\displaystyle x^2", 200).unwrap();
    assert_eq!(body, formula_png());

    let url = urls.recv().unwrap();
    let decoded = urlencoding::decode(&url).unwrap();
    assert!(decoded.starts_with("/png.latex?"), "{}", decoded);
    assert!(decoded.contains(r"\dpi{200}\displaystyle x^2"), "{}", decoded);
}

#[test]
fn request_url_encodes_payload() {
    let client = client_for("https://latex.codecogs.com/png.latex".into());
    assert_eq!(
        client.request_url("a+b", 300),
        "https://latex.codecogs.com/png.latex?\\dpi{300}a%2Bb"
    );
}

#[test]
fn server_error_is_reported_with_status() {
    let (endpoint, _urls) = start_service(500, b"boom".to_vec(), 1);
    let client = client_for(endpoint);
    match client.fetch("x", 200) {
        Err(Error::ServiceStatus { status, latex }) => {
            assert_eq!(status, 500);
            assert_eq!(latex, "x");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[test]
fn unreachable_service_is_a_network_error() {
    // Bind then drop to get a port nothing listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = client_for(format!("http://127.0.0.1:{}/png.latex", port));
    assert!(matches!(client.fetch("x", 200), Err(Error::NetworkError(_))));
}

#[test]
fn rasterizer_decodes_service_output() {
    let (endpoint, urls) = start_service(200, formula_png(), 1);
    let rasterizer = Rasterizer::new(Box::new(client_for(endpoint)));

    let image = rasterizer.rasterize(r"$\frac{1}{2}$", 200).expect("formula");
    assert_eq!((image.width(), image.height()), (30, 12));
    let url = urls.recv().unwrap();
    assert!(urlencoding::decode(&url).unwrap().ends_with(r"\displaystyle \frac{1}{2}"));
}

#[test]
fn rasterizer_swallows_service_errors() {
    let (endpoint, _urls) = start_service(404, Vec::new(), 1);
    let rasterizer = Rasterizer::new(Box::new(client_for(endpoint)));
    assert!(rasterizer.rasterize("x", 200).is_none());
}
