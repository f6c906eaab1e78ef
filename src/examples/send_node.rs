use binxml_token::*;
use rand::Rng;
use std::net::UdpSocket;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let sock = UdpSocket::bind("0.0.0.0:0")?;
    sock.connect("127.0.0.1:50051")?;

    let config = match std::env::args().nth(1) {
        Some(path) => CodecConfig::from_path(path)?,
        None => CodecConfig::default(),
    };
    let codec = FrameCodec::new(config)?;

    // Announce the dictionary first so the receiver can refuse a mismatch
    let manifest = DictionaryManifest::local();
    let hello = Node::new("stream:features").with_text(manifest.to_json()?);
    let bytes = codec.encode(&hello)?;
    sock.send(&bytes)?;
    tracing::info!("Sent manifest frame: {} bytes", bytes.len());

    let msg_id: u32 = rand::thread_rng().gen();
    let message = Node::new("message")
        .with_attr("id", format!("{:08X}", msg_id))
        .with_attr("type", "text")
        .with_attr("to", "15551234567@s.whatsapp.net")
        .with_children(vec![Node::new("body").with_text("hello from binxml")]);
    let bytes = codec.encode(&message)?;
    sock.send(&bytes)?;
    tracing::info!("Sent message {:08X}: {} bytes", msg_id, bytes.len());

    // Large enough to cross the compression threshold
    let media = Node::new("media")
        .with_attr("mimetype", "image/jpeg")
        .with_bytes(vec![0u8; 8192]);
    let bytes = codec.encode(&media)?;
    sock.send(&bytes)?;
    tracing::info!("Sent media frame: {} bytes", bytes.len());

    Ok(())
}
