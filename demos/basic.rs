use resilient_api_client::{ApiClient, ErrorCategory, RequestConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct Task {
    id: u64,
    title: String,
    status: String,
}

#[derive(Serialize)]
struct NewTask<'a> {
    title: &'a str,
    due_date: &'a str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let api = ApiClient::from_env().map_err(anyhow::Error::msg)?;

    let created: Task = api
        .post(
            "/tasks",
            &NewTask {
                title: "Grade midterm essays",
                due_date: "2026-11-01",
            },
            // Creating is not idempotent; do not replay it.
            RequestConfig::new().max_retries(0),
        )
        .await?;
    println!("created task {} ({})", created.id, created.title);

    match api.get::<Vec<Task>>("/tasks", ()).await {
        Ok(tasks) => {
            for task in tasks {
                println!("{:>4} {:<12} {}", task.id, task.status, task.title);
            }
        }
        Err(err) if err.category() == ErrorCategory::Unauthorized => {
            eprintln!("session expired: {}", err.message());
        }
        Err(err) => {
            eprintln!(
                "listing failed after {} attempt(s): {err}",
                err.attempts().len()
            );
            return Err(err.into());
        }
    }

    Ok(())
}
