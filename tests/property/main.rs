mod graph;
mod layers;
