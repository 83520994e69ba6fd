//! Chunk streamer - drives generation, meshing and upload around an observer
//!
//! Each tick the store's window is updated; newly created chunks are
//! handed to rayon workers which fill samples and extract a mesh, then send
//! the result back over a channel. Uploads and releases run on the ticking
//! thread only, so a [`MeshSink`] never needs to be `Send`.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use glam::Vec3;
use rayon::prelude::*;

use crate::mesh::{MarchingCubes, MeshSink, MeshVertex};
use crate::voxel::{Chunk, ChunkStore, ScalarField, StreamRadii};

/// Mesh produced by a generation worker
struct GeneratedMesh {
    chunk: Arc<Chunk>,
    vertices: Vec<MeshVertex>,
}

/// Counters for one streamer tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Chunks created and sent for generation
    pub queued: usize,
    /// Chunks removed from the store
    pub unloaded: usize,
    /// Chunks kept past the unload radius because work is in flight
    pub deferred: usize,
    /// Meshes handed to the sink
    pub uploaded: usize,
    /// Generation jobs still running after the tick
    pub in_flight: usize,
    /// Chunks in the store
    pub total: usize,
}

/// Owns the chunk store and keeps it populated around an observer
pub struct ChunkStreamer {
    store: ChunkStore,
    field: Arc<dyn ScalarField>,
    mesher: MarchingCubes,
    radii: StreamRadii,
    results_tx: Sender<GeneratedMesh>,
    results_rx: Receiver<GeneratedMesh>,
    in_flight: usize,
}

impl ChunkStreamer {
    pub fn new(field: Arc<dyn ScalarField>, radii: StreamRadii, mesher: MarchingCubes) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            store: ChunkStore::new(),
            field,
            mesher,
            radii,
            results_tx,
            results_rx,
            in_flight: 0,
        }
    }

    /// The chunk store, for sampling
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn radii(&self) -> StreamRadii {
        self.radii
    }

    /// Generation jobs not yet received back
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Non-blocking tick: update the window, dispatch new chunks to the
    /// worker pool, release evicted meshes and upload whatever finished.
    pub fn tick(&mut self, observer: Vec3, sink: &mut dyn MeshSink) -> StreamStats {
        let created = self.store.update_with(observer, self.radii);
        let queued = created.len();
        for chunk in created {
            self.spawn_generation(chunk);
        }

        self.release_evicted(sink);

        let mut uploaded = 0;
        while let Ok(result) = self.results_rx.try_recv() {
            self.in_flight -= 1;
            uploaded += Self::upload(result, sink);
        }

        self.stats(queued, uploaded)
    }

    /// Blocking load: generate and upload the whole window around
    /// `observer` before returning. Used before the first frame.
    pub fn warm_up(&mut self, observer: Vec3, sink: &mut dyn MeshSink) -> StreamStats {
        let created = self.store.update_with(observer, self.radii);
        let queued = created.len();

        let field: &dyn ScalarField = &*self.field;
        let mesher = self.mesher;
        let results: Vec<GeneratedMesh> = created
            .into_par_iter()
            .map(|chunk| {
                let vertices = generate_and_mesh(&chunk, field, &mesher);
                GeneratedMesh { chunk, vertices }
            })
            .collect();

        self.release_evicted(sink);

        let mut uploaded: usize = results.into_iter().map(|r| Self::upload(r, sink)).sum();
        uploaded += self.flush(sink);

        log::info!(
            "Warm-up complete: {} chunks generated, {} resident",
            queued,
            self.store.len()
        );
        self.stats(queued, uploaded)
    }

    /// Block until every dispatched job has been received and uploaded.
    /// Returns the number of uploads.
    pub fn flush(&mut self, sink: &mut dyn MeshSink) -> usize {
        let mut uploaded = 0;
        while self.in_flight > 0 {
            match self.results_rx.recv() {
                Ok(result) => {
                    self.in_flight -= 1;
                    uploaded += Self::upload(result, sink);
                }
                // Unreachable while we hold a sender
                Err(_) => break,
            }
        }
        uploaded
    }

    fn spawn_generation(&mut self, chunk: Arc<Chunk>) {
        let field = Arc::clone(&self.field);
        let mesher = self.mesher;
        let tx = self.results_tx.clone();
        self.in_flight += 1;
        rayon::spawn(move || {
            let vertices = generate_and_mesh(&chunk, &*field, &mesher);
            // The receiver lives as long as the streamer; a send error only
            // means it was dropped mid-shutdown.
            let _ = tx.send(GeneratedMesh { chunk, vertices });
        });
    }

    fn release_evicted(&mut self, sink: &mut dyn MeshSink) {
        for coord in self.store.drain_evicted() {
            sink.release(coord);
        }
    }

    /// Ready -> Uploading -> Resident. Returns 1 if the sink was called.
    fn upload(result: GeneratedMesh, sink: &mut dyn MeshSink) -> usize {
        let lifecycle = result.chunk.lifecycle();
        if !lifecycle.begin_upload() {
            log::warn!(
                "Dropping mesh for chunk {:?} in state {:?}",
                result.chunk.coord(),
                lifecycle.state()
            );
            return 0;
        }
        sink.upload(result.chunk.coord(), &result.vertices);
        lifecycle.finish_upload();
        1
    }

    fn stats(&self, queued: usize, uploaded: usize) -> StreamStats {
        let update = self.store.last_update();
        StreamStats {
            queued,
            unloaded: update.unloaded,
            deferred: update.deferred,
            uploaded,
            in_flight: self.in_flight,
            total: self.store.len(),
        }
    }
}

fn generate_and_mesh(chunk: &Chunk, field: &dyn ScalarField, mesher: &MarchingCubes) -> Vec<MeshVertex> {
    if chunk.run_generation(field) {
        mesher.extract(chunk)
    } else {
        Vec::new()
    }
}
