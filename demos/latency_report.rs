use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    wvb_latency::apps::run_latency_report(std::env::args().skip(1))
}
