//! Parse command implementation

use crate::feed::{parse_ws_message, NormalizedTrade};
use anyhow::Context;
use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// File of captured frames, or `-` for stdin
    pub input: String,

    /// Pretty-print each trade
    #[arg(long)]
    pub pretty: bool,
}

impl ParseArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let (frames, trades) = if self.input == "-" {
            parse_frames(BufReader::new(tokio::io::stdin())).await?
        } else {
            let file = tokio::fs::File::open(&self.input)
                .await
                .with_context(|| format!("Failed to open {}", self.input))?;
            parse_frames(BufReader::new(file)).await?
        };

        for trade in &trades {
            let line = if self.pretty {
                serde_json::to_string_pretty(trade)?
            } else {
                serde_json::to_string(trade)?
            };
            println!("{}", line);
        }

        eprintln!("{} frames, {} trades", frames, trades.len());
        Ok(())
    }
}

/// Normalize every non-blank line; returns the frame count and all trades
pub async fn parse_frames<R>(reader: R) -> anyhow::Result<(usize, Vec<NormalizedTrade>)>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut frames = 0;
    let mut trades = Vec::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        frames += 1;
        trades.extend(parse_ws_message(&line));
    }

    Ok((frames, trades))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_frames() {
        let input = concat!(
            r#"{"data":{"price":"0.5","size":"10","asset_id":"1","timestamp":1700000000}}"#,
            "\n\n",
            r#"{"type":"heartbeat"}"#,
            "\n",
            "not json\n",
            r#"[{"price":0.25,"size":4,"asset_id":"2"},{"price":0.5,"size":2,"asset_id":"3"}]"#,
            "\n",
        );

        let (frames, trades) = parse_frames(input.as_bytes()).await.unwrap();

        assert_eq!(frames, 4);
        assert_eq!(trades.len(), 3);
        assert_eq!(trades[0].notional_usd, 5.0);
        assert_eq!(trades[1].token_id, "2");
    }
}
