//! Make one 30 second clip from a YouTube video.
//!
//! Usage: cargo run --example basic -- https://www.youtube.com/watch?v=...

#[tokio::main]
async fn main() -> shortclip::Result<()> {
    let url = std::env::args()
        .nth(1)
        .expect("usage: basic <youtube-url>");

    let clip = shortclip::create_clip(&url).await?;

    println!("{} [{}]", clip.output_path.display(), clip.segment.label());
    println!("{}", clip.transcription);

    Ok(())
}
