use sinkhole::error::AppResult;

fn main() -> AppResult<()> {
    sinkhole::entry::run()
}
