//! Blog collection accessor.
//!
//! Owns the publication lifecycle: slug derivation at create time,
//! the publish-timestamp rules on state transitions, and the separate
//! owner and public orderings.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::content::slugify;
use crate::db::collections;
use crate::db::error::StoreError;
use crate::db::log_failure;
use crate::db::models::{timestamp, to_doc, BlogPost, NewBlogPost, PatchBlogPost};
use crate::db::sort::Comparator;
use crate::db::store::{Document, DocumentStore, Filter};

pub struct BlogPosts {
    store: Arc<dyn DocumentStore>,
}

impl BlogPosts {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Dashboard ordering: pinned posts first, then newest drafts.
    fn owner_ordering() -> Comparator<BlogPost> {
        Comparator::new()
            .desc(|p: &BlogPost| p.featured)
            .desc(|p: &BlogPost| p.created_at)
            .asc(|p: &BlogPost| p.id.clone())
    }

    /// Public ordering: most recently published first. A missing stamp
    /// sorts last, which only matters for legacy documents.
    fn public_ordering() -> Comparator<BlogPost> {
        Comparator::new()
            .desc(|p: &BlogPost| p.published_at)
            .asc(|p: &BlogPost| p.id.clone())
    }

    /// Inserts a post, deriving the slug from the title when the caller
    /// leaves it blank. A post born published gets its publish stamp at
    /// creation.
    pub async fn create(&self, owner_id: &str, mut data: NewBlogPost) -> Result<String, StoreError> {
        let slug = match data.slug.as_deref().map(str::trim) {
            Some(given) if !given.is_empty() => given.to_string(),
            _ => slugify(&data.title),
        };
        data.slug = Some(slug);

        let now = Utc::now();
        let mut doc = to_doc(&data);
        doc.insert("ownerId".to_string(), Value::String(owner_id.to_string()));
        doc.insert("viewCount".to_string(), Value::from(0));
        doc.insert("createdAt".to_string(), timestamp(now));
        doc.insert("updatedAt".to_string(), timestamp(now));
        if data.published {
            doc.insert("publishedAt".to_string(), timestamp(now));
        }

        self.store
            .insert(collections::BLOG, doc)
            .await
            .map_err(|e| log_failure("create blog post", e))
    }

    pub async fn get(&self, id: &str) -> Result<Option<BlogPost>, StoreError> {
        match self
            .store
            .get(collections::BLOG, id)
            .await
            .map_err(|e| log_failure("fetch blog post", e))?
        {
            Some(doc) => Ok(Some(BlogPost::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<BlogPost>, StoreError> {
        let mut posts = self
            .fetch(Filter::new().eq("ownerId", owner_id))
            .await?;
        Self::owner_ordering().sort(&mut posts);
        Ok(posts)
    }

    pub async fn list_published(&self, owner_id: &str) -> Result<Vec<BlogPost>, StoreError> {
        let mut posts = self
            .fetch(Filter::new().eq("ownerId", owner_id).eq("published", true))
            .await?;
        Self::public_ordering().sort(&mut posts);
        Ok(posts)
    }

    /// Published post by slug. Slugs are not enforced unique, so a
    /// duplicate resolves to the most recently published match.
    pub async fn get_by_slug_published(
        &self,
        owner_id: &str,
        slug: &str,
    ) -> Result<Option<BlogPost>, StoreError> {
        let mut posts = self
            .fetch(
                Filter::new()
                    .eq("ownerId", owner_id)
                    .eq("slug", slug)
                    .eq("published", true),
            )
            .await?;
        Self::public_ordering().sort(&mut posts);
        Ok(posts.into_iter().next())
    }

    async fn fetch(&self, filter: Filter) -> Result<Vec<BlogPost>, StoreError> {
        let docs = self
            .store
            .find(collections::BLOG, filter)
            .await
            .map_err(|e| log_failure("list blog posts", e))?;
        docs.into_iter().map(BlogPost::from_doc).collect()
    }

    /// Shallow-merges the patch. Publish transitions maintain the
    /// publish stamp: the first unpublished-to-published flip stamps it
    /// (keeping an already-present stamp rather than clobbering it),
    /// re-publishing an already-published post leaves it alone, and
    /// unpublishing clears it so the next publish stamps fresh.
    pub async fn update(&self, id: &str, patch: PatchBlogPost) -> Result<Option<BlogPost>, StoreError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };

        let mut doc = to_doc(&patch);
        match patch.published {
            Some(true) if !existing.published => {
                let at = existing.published_at.unwrap_or_else(Utc::now);
                doc.insert("publishedAt".to_string(), timestamp(at));
            }
            Some(false) => {
                doc.insert("publishedAt".to_string(), Value::Null);
            }
            _ => {}
        }
        doc.insert("updatedAt".to_string(), timestamp(Utc::now()));

        match self
            .store
            .merge(collections::BLOG, id, doc)
            .await
            .map_err(|e| log_failure("update blog post", e))?
        {
            Some(doc) => Ok(Some(BlogPost::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn toggle_published(&self, id: &str) -> Result<Option<BlogPost>, StoreError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        self.update(
            id,
            PatchBlogPost {
                published: Some(!existing.published),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn toggle_featured(&self, id: &str) -> Result<Option<BlogPost>, StoreError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        self.update(
            id,
            PatchBlogPost {
                featured: Some(!existing.featured),
                ..Default::default()
            },
        )
        .await
    }

    /// Bumps the view counter. Read-increment-merge without a
    /// transaction; concurrent views may drop a count, which is
    /// acceptable for this statistic. Does not touch `updatedAt`.
    pub async fn record_view(&self, id: &str) -> Result<(), StoreError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(());
        };
        let mut patch = Document::new();
        patch.insert("viewCount".to_string(), Value::from(existing.view_count + 1));
        self.store
            .merge(collections::BLOG, id, patch)
            .await
            .map_err(|e| log_failure("record blog view", e))?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store
            .delete(collections::BLOG, id)
            .await
            .map_err(|e| log_failure("delete blog post", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::db::memory::MemoryStore;
    use crate::db::models::BlogCategory;

    fn sample(title: &str) -> NewBlogPost {
        NewBlogPost {
            title: title.into(),
            slug: None,
            excerpt: "excerpt".into(),
            content: "content words".into(),
            cover_image: None,
            category: BlogCategory::Engineering,
            tags: vec!["rust".into()],
            published: false,
            featured: false,
            order: 0,
        }
    }

    fn accessor() -> BlogPosts {
        BlogPosts::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_derives_the_slug_from_the_title() {
        let posts = accessor();
        let id = posts.create("o", sample("Hello, World!")).await.unwrap();
        let post = posts.get(&id).await.unwrap().unwrap();
        assert_eq!(post.slug, "hello-world");
    }

    #[tokio::test]
    async fn an_explicit_slug_wins_over_derivation() {
        let posts = accessor();
        let mut data = sample("Some Title");
        data.slug = Some("custom-slug".into());
        let id = posts.create("o", data).await.unwrap();
        assert_eq!(posts.get(&id).await.unwrap().unwrap().slug, "custom-slug");

        let mut blank = sample("Blank Slug");
        blank.slug = Some("   ".into());
        let id = posts.create("o", blank).await.unwrap();
        assert_eq!(posts.get(&id).await.unwrap().unwrap().slug, "blank-slug");
    }

    #[tokio::test]
    async fn a_post_born_published_is_stamped_at_creation() {
        let posts = accessor();
        let mut data = sample("Live");
        data.published = true;
        let id = posts.create("o", data).await.unwrap();

        let post = posts.get(&id).await.unwrap().unwrap();
        assert!(post.published);
        assert!(post.published_at.is_some());
    }

    #[tokio::test]
    async fn first_publish_stamps_and_later_edits_keep_the_stamp() {
        let posts = accessor();
        let id = posts.create("o", sample("Draft")).await.unwrap();
        assert!(posts.get(&id).await.unwrap().unwrap().published_at.is_none());

        let published = posts.toggle_published(&id).await.unwrap().unwrap();
        let first_stamp = published.published_at.unwrap();

        // An ordinary edit, and even a redundant published=true, must
        // not move the stamp.
        let edited = posts
            .update(
                &id,
                PatchBlogPost {
                    title: Some("Renamed".into()),
                    published: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edited.published_at, Some(first_stamp));
    }

    #[tokio::test]
    async fn unpublish_clears_the_stamp_and_republish_stamps_fresh() {
        let posts = accessor();
        let id = posts.create("o", sample("Cycle")).await.unwrap();

        let first = posts.toggle_published(&id).await.unwrap().unwrap();
        let first_stamp = first.published_at.unwrap();

        let unpublished = posts.toggle_published(&id).await.unwrap().unwrap();
        assert!(!unpublished.published);
        assert!(unpublished.published_at.is_none());

        tokio::time::sleep(Duration::from_millis(2)).await;
        let republished = posts.toggle_published(&id).await.unwrap().unwrap();
        assert!(republished.published_at.unwrap() > first_stamp);
    }

    #[tokio::test]
    async fn owner_listing_pins_featured_then_newest() {
        let posts = accessor();
        posts.create("o", sample("older")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        posts.create("o", sample("newer")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        let mut pinned = sample("pinned");
        pinned.featured = true;
        posts.create("o", pinned).await.unwrap();

        let titles: Vec<_> = posts
            .list("o")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["pinned", "newer", "older"]);
    }

    #[tokio::test]
    async fn public_listing_excludes_drafts_and_orders_by_publish_time() {
        let posts = accessor();
        let early = posts.create("o", sample("early")).await.unwrap();
        let late = posts.create("o", sample("late")).await.unwrap();
        posts.create("o", sample("draft")).await.unwrap();

        posts.toggle_published(&early).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        posts.toggle_published(&late).await.unwrap();

        let titles: Vec<_> = posts
            .list_published("o")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["late", "early"]);
    }

    #[tokio::test]
    async fn slug_lookup_only_sees_published_posts() {
        let posts = accessor();
        let id = posts.create("o", sample("Hidden Gem")).await.unwrap();

        assert!(posts
            .get_by_slug_published("o", "hidden-gem")
            .await
            .unwrap()
            .is_none());

        posts.toggle_published(&id).await.unwrap();
        let found = posts
            .get_by_slug_published("o", "hidden-gem")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);

        // Another owner's slug space is separate.
        assert!(posts
            .get_by_slug_published("someone-else", "hidden-gem")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn views_accumulate_without_touching_updated_at() {
        let posts = accessor();
        let id = posts.create("o", sample("Counted")).await.unwrap();
        let before = posts.get(&id).await.unwrap().unwrap();

        posts.record_view(&id).await.unwrap();
        posts.record_view(&id).await.unwrap();

        let after = posts.get(&id).await.unwrap().unwrap();
        assert_eq!(after.view_count, 2);
        assert_eq!(after.updated_at, before.updated_at);

        // Views on unknown ids are a quiet no-op.
        posts.record_view("ghost").await.unwrap();
    }
}
