use std::sync::Arc;

use flicker_core::OscillationEngine;

use super::CommandError;

pub fn run(host: &str, port: u16) -> Result<(), CommandError> {
    let engine = Arc::new(OscillationEngine::new());
    let base = format!("http://{host}:{port}");

    println!("flicker server v{}", flicker_core::VERSION);
    println!("   {base}");
    println!();
    println!("   Endpoints:");
    println!("     GET  /                      API index (try: curl {base})");
    println!("     GET  /health                Health check");
    println!("     GET  /entropy/status        Source success rates and quality");
    println!("     GET  /entropy/selftest      Pipeline self-test (?samples=N)");
    println!("     GET  /contexts              List contexts");
    println!("     POST /contexts              Create a context");
    println!("     POST /contexts/{{id}}/tick    Advance one tick (?metrics=true)");
    println!("     GET  /contexts/{{id}}/metrics Metrics over history");
    println!("     GET  /contexts/{{id}}/export  Export for suspend/resume");
    println!("     POST /contexts/import       Restore an exported context");
    println!();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(flicker_server::run_server(engine, host, port));
    Ok(())
}
