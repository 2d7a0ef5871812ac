//! Redis JobRepository implementation.

use super::pool::RedisPool;
use super::JOB_PREFIX;
use crate::domain::jobs::{Job, JobMode, JobUpdate, UpdateOutcome};
use crate::ports::repository::JobRepository;
use crate::ports::StoreError;
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands, Value};
use tracing::warn;
use uuid::Uuid;

/// Attempts before giving up on an id collision or a contended update.
const MAX_ATTEMPTS: usize = 8;

fn job_key(job_id: &str) -> String {
    format!("{}{}", JOB_PREFIX, job_id)
}

#[async_trait]
impl JobRepository for RedisPool {
    async fn create(
        &self,
        video_id: &str,
        mode: JobMode,
        title: Option<String>,
    ) -> Result<String, StoreError> {
        let ttl = Self::ttl_secs(self.ttls.job);
        self.with_conn(|mut conn| async move {
            for _ in 0..MAX_ATTEMPTS {
                let job_id = Uuid::new_v4().to_string();
                let job = Job::new(job_id.clone(), video_id.to_string(), mode, title.clone());
                let json = serde_json::to_string(&job)?;

                // NX: never overwrite a live record under the same id.
                let created: Option<Value> = redis::cmd("SET")
                    .arg(job_key(&job_id))
                    .arg(json)
                    .arg("EX")
                    .arg(ttl)
                    .arg("NX")
                    .query_async(&mut conn)
                    .await?;
                if created.is_some() {
                    return Ok(job_id);
                }
                warn!(job_id, "Job id collision, regenerating");
            }
            Err(StoreError::Unavailable("could not allocate a job id".to_string()))
        })
        .await
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        self.with_conn(|mut conn| async move {
            let json: Option<String> = conn.get(job_key(job_id)).await?;
            match json {
                Some(data) => Ok(Some(serde_json::from_str(&data)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<UpdateOutcome, StoreError> {
        let ttl = Self::ttl_secs(self.ttls.job);
        let key = job_key(job_id);
        self.with_conn(|mut conn| async move {
            // Optimistic read-modify-write: EXEC aborts if the key changed
            // after WATCH, in which case the merge is redone on fresh data.
            for _ in 0..MAX_ATTEMPTS {
                let _: () = redis::cmd("WATCH").arg(&key).query_async(&mut conn).await?;

                let json: Option<String> = conn.get(&key).await?;
                let Some(data) = json else {
                    let _: () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
                    return Ok(UpdateOutcome::Expired);
                };

                let mut job: Job = match serde_json::from_str(&data) {
                    Ok(job) => job,
                    Err(e) => {
                        let _: () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
                        return Err(e.into());
                    }
                };
                if let Err(e) = job.apply(&update) {
                    let _: () = redis::cmd("UNWATCH").query_async(&mut conn).await?;
                    return Ok(UpdateOutcome::Rejected(e));
                }

                let committed: Option<Value> = redis::pipe()
                    .atomic()
                    .set_ex(&key, serde_json::to_string(&job)?, ttl)
                    .query_async(&mut conn)
                    .await?;
                if committed.is_some() {
                    return Ok(UpdateOutcome::Applied(job));
                }
            }
            Err(StoreError::Unavailable(format!(
                "job {} kept changing during update",
                job_id
            )))
        })
        .await
    }

    async fn ping(&self) -> bool {
        self.with_conn(|mut conn| async move {
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(pong == "PONG")
        })
        .await
        .unwrap_or(false)
    }
}
