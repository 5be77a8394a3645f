//! Root page handler - analysis dashboard

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};

use crate::AppState;

/// GET /
pub async fn root_page(State(state): State<AppState>) -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = env!("GIT_HASH");
    let build_timestamp = env!("BUILD_TIMESTAMP");
    let classifier_url = html_escape(&state.config.classifier.base_url);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Chest Radiology Center</title>
    <link rel="stylesheet" href="/static/dashboard.css">
</head>
<body>
    <header>
        <h1>Chest Radiology Center</h1>
        <span id="connection-status" class="connection-status">connecting</span>
    </header>

    <main class="grid">
        <section class="panel">
            <h2>Analysis Terminal</h2>
            <label id="drop-zone" class="drop-zone" for="file-input">
                <img id="preview" alt="" hidden>
                <span id="drop-hint">Drop a chest X-ray here or click to browse</span>
                <input id="file-input" type="file" accept="image/*" hidden>
            </label>
            <p id="upload-error" class="inline-error" hidden></p>
            <button id="run-button" disabled>Run Diagnostic Scan</button>
            <button id="cancel-button" class="secondary" hidden>Cancel</button>

            <div id="result-card" class="result-card" hidden>
                <div id="simulated-banner" class="advisory" hidden>
                    Simulated result: the classification service was unavailable, this
                    label and confidence were generated locally and are not a model output.
                </div>
                <div class="result-row"><span>Finding</span><strong id="result-label"></strong></div>
                <div class="result-row"><span>Confidence</span><strong id="result-confidence"></strong></div>
                <div class="result-row"><span>Completed</span><span id="result-timestamp"></span></div>
            </div>
        </section>

        <aside>
            <section class="panel">
                <h2>Clinical Report</h2>
                <pre id="report" class="report">Upload and analyze an X-ray to generate a clinical radiology report.</pre>
            </section>

            <section id="error-panel" class="panel warning" hidden>
                <button id="dismiss-error" class="dismiss" aria-label="Dismiss">&times;</button>
                <h3>Engine Warning</h3>
                <p id="error-message"></p>
                <p class="hint">Ensure the classification service is reachable at {classifier_url}</p>
            </section>
        </aside>
    </main>

    <footer>
        <p class="disclaimer">AI-assisted simulation. Not a diagnostic device; outputs require review by a qualified professional.</p>
        <p class="build-info">cxr-dash v{version} [{git_hash}] built {build_timestamp}</p>
    </footer>

    <script src="/static/dashboard.js"></script>
</body>
</html>
"#
    ))
}

fn html_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
