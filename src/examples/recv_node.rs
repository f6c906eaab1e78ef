use binxml_token::*;
use std::net::UdpSocket;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let sock = UdpSocket::bind("127.0.0.1:50051")?;
    tracing::info!("Listening on 127.0.0.1:50051");

    let codec = FrameCodec::new(CodecConfig::default())?;
    let local = DictionaryManifest::local();
    let mut frames = FrameBuffer::new(codec.config());
    let mut buf = vec![0u8; 65536];

    loop {
        let (size, src) = match sock.recv_from(&mut buf) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Recv error: {}", e);
                continue;
            }
        };
        tracing::debug!("Received {} bytes from {}", size, src);
        frames.push(&buf[..size]);

        loop {
            let payload = match frames.next_frame() {
                Ok(Some(p)) => p,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Stream from {} reset: {}", src, e);
                    break;
                }
            };
            match codec.decode_payload(&payload) {
                Ok(node) => handle_node(&node, &local),
                Err(e) => tracing::warn!("Failed to decode frame: {}", e),
            }
        }
    }
}

fn handle_node(node: &Node, local: &DictionaryManifest) {
    match node.tag.as_str() {
        "stream:features" => {
            let remote = node
                .content_bytes()
                .and_then(|b| std::str::from_utf8(b).ok())
                .map(DictionaryManifest::from_json);
            match remote {
                Some(Ok(remote)) => match local.check_compatible(&remote) {
                    Ok(()) => tracing::info!("Peer dictionary matches ({:#x})", remote.fingerprint),
                    Err(e) => tracing::warn!("Peer dictionary rejected: {}", e),
                },
                _ => tracing::warn!("Malformed manifest node"),
            }
        }
        "message" => {
            let body = node
                .children()
                .iter()
                .find(|c| c.tag == "body")
                .and_then(|c| c.content_bytes())
                .map(String::from_utf8_lossy);
            tracing::info!(
                "Message {} to {}: {:?}",
                node.attr("id").unwrap_or("-"),
                node.attr("to").unwrap_or("-"),
                body
            );
        }
        other => tracing::info!(
            "Node <{}> with {} attrs, {} content bytes",
            other,
            node.attrs.len(),
            node.content_bytes().map_or(0, |b| b.len())
        ),
    }
}
