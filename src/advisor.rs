// =============================================================================
// AI Advisor — hosted-LLM client for narrative analysis & code generation
// =============================================================================
//
// Thin, opaque request/response boundary: an indicator-derived prompt goes
// out, a JSON sentiment record (or plain source text) comes back. The engine
// never depends on this service being up — every failure path degrades to a
// neutral result so indicator computation alone keeps the dashboard alive.
//
// The API key is read from QUANTFLOW_AI_API_KEY; a missing key short-circuits
// before any network call.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::indicators::IndicatorSnapshot;
use crate::types::StrategyKind;

/// Hosted model used for both analysis and code generation.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Environment variable holding the advisor API key.
pub const API_KEY_ENV: &str = "QUANTFLOW_AI_API_KEY";

// =============================================================================
// Result types
// =============================================================================

/// Market read returned by the advisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

/// Structured advisory record for the dashboard panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorAnalysis {
    pub sentiment: Sentiment,
    /// 0–100.
    pub confidence: f64,
    pub recommendation: String,
    pub reasoning: String,
}

impl AdvisorAnalysis {
    /// Neutral, zero-confidence fallback used on every failure path.
    fn degraded(recommendation: &str, reasoning: &str) -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence: 0.0,
            recommendation: recommendation.to_string(),
            reasoning: reasoning.to_string(),
        }
    }
}

// =============================================================================
// AdvisorClient
// =============================================================================

/// HTTP client for the hosted model.
#[derive(Clone)]
pub struct AdvisorClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AdvisorClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Build the client from [`API_KEY_ENV`]; an unset variable produces a
    /// client that only ever returns degraded results.
    pub fn from_env() -> Self {
        Self::new(std::env::var(API_KEY_ENV).unwrap_or_default())
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    // ── Market analysis ─────────────────────────────────────────────────────

    /// Ask the model for a sentiment/recommendation record built from the
    /// latest indicator snapshot. Never fails: network, HTTP, and parse
    /// errors all collapse into a neutral analysis.
    pub async fn analyze_market(
        &self,
        symbol: &str,
        price: f64,
        strategy: StrategyKind,
        snapshot: &IndicatorSnapshot,
    ) -> AdvisorAnalysis {
        if !self.has_key() {
            return AdvisorAnalysis::degraded("API key missing.", "Cannot reach the AI advisor.");
        }

        let prompt = build_analysis_prompt(symbol, price, strategy, snapshot);

        match self.generate(&prompt, None, true).await {
            Ok(text) => match parse_analysis(&text) {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!(error = %e, "advisor returned unparseable analysis");
                    AdvisorAnalysis::degraded("Analysis error", "Failed to process market data.")
                }
            },
            Err(e) => {
                warn!(error = %e, "advisor analysis request failed");
                AdvisorAnalysis::degraded("Analysis error", "Failed to process market data.")
            }
        }
    }

    // ── Code generation ─────────────────────────────────────────────────────

    /// Generate expert-advisor source for the given plain-text requirement.
    /// Failures return a comment-string placeholder instead of an error.
    pub async fn generate_strategy_code(&self, description: &str) -> String {
        if !self.has_key() {
            return "// API key missing".to_string();
        }

        let prompt = format!(
            "Generate MQL5 code for a MetaTrader 5 Expert Advisor (EA).\n\
             Requirement: {description}\n\
             Include imports, OnTick(), and Trade classes.\n\
             Ensure the code is complete and compilable."
        );

        match self.generate(&prompt, Some(CODE_SYSTEM_INSTRUCTION), false).await {
            Ok(code) => code,
            Err(e) => {
                warn!(error = %e, "strategy code generation failed");
                "// Failed to generate code".to_string()
            }
        }
    }

    /// Repair or amend previously generated source. Same degradation rules
    /// as [`Self::generate_strategy_code`].
    pub async fn fix_strategy_code(&self, current_code: &str, error_description: &str) -> String {
        if !self.has_key() {
            return "// API key missing".to_string();
        }

        let prompt = format!(
            "The user has the following MQL5 code:\n\n{current_code}\n\n\
             They encountered this error or have this request: \"{error_description}\"\n\n\
             Task: Fix the code or apply the requested changes.\n\
             Output: Return ONLY the full corrected MQL5 source code. \
             Do not include markdown blocks or explanations."
        );

        match self.generate(&prompt, Some(CODE_SYSTEM_INSTRUCTION), false).await {
            Ok(code) => code,
            Err(e) => {
                warn!(error = %e, "strategy code fix failed");
                "// Failed to fix code".to_string()
            }
        }
    }

    // ── Transport ───────────────────────────────────────────────────────────

    /// POST a generateContent request and pull the first text part out of the
    /// response envelope.
    async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        json_mode: bool,
    ) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let mut body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if json_mode {
            body["generationConfig"] = serde_json::json!({ "responseMimeType": "application/json" });
        }
        if let Some(instruction) = system_instruction {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": instruction }] });
        }

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("generateContent request failed")?;

        let status = resp.status();
        let envelope: serde_json::Value = resp
            .json()
            .await
            .context("generateContent response was not JSON")?;

        if !status.is_success() {
            anyhow::bail!("generateContent returned {status}: {envelope}");
        }

        debug!(model = %self.model, "advisor response received");
        extract_text(&envelope).context("response envelope contained no text part")
    }
}

const CODE_SYSTEM_INSTRUCTION: &str =
    "You are an expert MQL5 developer. Output only raw code. No markdown formatting.";

// =============================================================================
// Prompt & response helpers
// =============================================================================

/// Render the five-indicator analysis prompt.
fn build_analysis_prompt(
    symbol: &str,
    price: f64,
    strategy: StrategyKind,
    snapshot: &IndicatorSnapshot,
) -> String {
    let strategy_hint = if strategy == StrategyKind::Scalping {
        "Since strategy is SCALPING, look for small price deviations at Bollinger bands \
         combined with Stochastic crossovers."
    } else {
        "Look for trend confirmation."
    };

    format!(
        "You are an expert high-frequency trading bot for MT5.\n\
         \n\
         Current Configuration:\n\
         - Symbol: {symbol}\n\
         - Price: {price:.5}\n\
         - Strategy: {strategy}\n\
         \n\
         Technical Indicators (Calculated):\n\
         1. RSI (14): {rsi:.2}\n\
         2. MACD Histogram: {hist:.6}\n\
         3. Bollinger Bands: Upper {upper:.5}, Lower {lower:.5}.\n\
         4. EMA (20): {ema:.5}\n\
         5. Stochastic: %K {k:.1}\n\
         \n\
         Task:\n\
         Analyze these 5 indicators. {strategy_hint}\n\
         \n\
         Return JSON:\n\
         {{\n\
           \"sentiment\": \"BULLISH\" | \"BEARISH\" | \"NEUTRAL\",\n\
           \"confidence\": number (0-100),\n\
           \"recommendation\": \"string (Action: Buy/Sell/Hold)\",\n\
           \"reasoning\": \"string (Short concise explanation)\"\n\
         }}",
        rsi = snapshot.rsi,
        hist = snapshot.macd.histogram,
        upper = snapshot.bollinger.upper,
        lower = snapshot.bollinger.lower,
        ema = snapshot.ema,
        k = snapshot.stochastic.k,
    )
}

/// Parse the model's JSON analysis payload.
fn parse_analysis(text: &str) -> Result<AdvisorAnalysis> {
    serde_json::from_str(text).context("analysis payload did not match the expected schema")
}

/// Pull `candidates[0].content.parts[0].text` out of a generateContent
/// response envelope.
fn extract_text(envelope: &serde_json::Value) -> Option<String> {
    envelope["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_prompt_lists_all_five_indicators() {
        let snapshot = IndicatorSnapshot {
            rsi: 63.2,
            ema: 1.08543,
            ..Default::default()
        };
        let prompt =
            build_analysis_prompt("EURUSD", 1.08512, StrategyKind::Scalping, &snapshot);

        assert!(prompt.contains("Symbol: EURUSD"));
        assert!(prompt.contains("Price: 1.08512"));
        assert!(prompt.contains("RSI (14): 63.20"));
        assert!(prompt.contains("MACD Histogram"));
        assert!(prompt.contains("EMA (20): 1.08543"));
        assert!(prompt.contains("Stochastic: %K 50.0"));
        assert!(prompt.contains("SCALPING"));
        assert!(prompt.contains("Bollinger bands"));
    }

    #[test]
    fn trend_strategies_get_the_trend_hint() {
        let prompt = build_analysis_prompt(
            "BTCUSD",
            64_000.0,
            StrategyKind::RsiMacd,
            &IndicatorSnapshot::default(),
        );
        assert!(prompt.contains("trend confirmation"));
        assert!(!prompt.contains("Stochastic crossovers"));
    }

    #[test]
    fn parse_analysis_accepts_the_documented_schema() {
        let text = r#"{
            "sentiment": "BULLISH",
            "confidence": 72.5,
            "recommendation": "Buy",
            "reasoning": "RSI recovering from oversold."
        }"#;
        let analysis = parse_analysis(text).unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Bullish);
        assert_eq!(analysis.confidence, 72.5);
        assert_eq!(analysis.recommendation, "Buy");
    }

    #[test]
    fn parse_analysis_rejects_garbage() {
        assert!(parse_analysis("not json").is_err());
        assert!(parse_analysis(r#"{"sentiment": "SIDEWAYS"}"#).is_err());
    }

    #[test]
    fn extract_text_walks_the_envelope() {
        let envelope = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "hello" }] }
            }]
        });
        assert_eq!(extract_text(&envelope).as_deref(), Some("hello"));
        assert_eq!(extract_text(&serde_json::json!({})), None);
    }

    #[tokio::test]
    async fn missing_key_short_circuits_to_neutral() {
        let client = AdvisorClient::new("");
        assert!(!client.has_key());

        let analysis = client
            .analyze_market(
                "EURUSD",
                1.085,
                StrategyKind::Scalping,
                &IndicatorSnapshot::default(),
            )
            .await;
        assert_eq!(analysis.sentiment, Sentiment::Neutral);
        assert_eq!(analysis.confidence, 0.0);

        let code = client.generate_strategy_code("breakout EA").await;
        assert_eq!(code, "// API key missing");

        let fixed = client.fix_strategy_code("int x;", "does not compile").await;
        assert_eq!(fixed, "// API key missing");
    }
}
